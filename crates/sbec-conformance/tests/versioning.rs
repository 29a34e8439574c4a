use pretty_assertions::assert_eq;
use sbec_conformance::car::*;

/// Header plus the 8 byte block a version 1 producer wrote, nothing more
fn version_one_buffer() -> [u8; 16] {
    let mut buf = [0_u8; 16];
    let mut header = MessageHeaderEncoder::default().wrap(WriteBuf::new(&mut buf), 0);
    header.block_length(8);
    header.template_id(evolving_codec::SBE_TEMPLATE_ID);
    header.schema_id(SCHEMA_ID);
    header.version(1);

    buf[8..12].copy_from_slice(&42_u32.to_le_bytes());
    buf[12..16].copy_from_slice(&1.5_f32.to_le_bytes());
    buf
}

#[test]
fn test_newer_fields_absent_for_older_producer() -> SbeResult<()> {
    assert_eq!(evolving_codec::SBE_BLOCK_LENGTH, 25);

    let buf = version_one_buffer();
    let header = MessageHeaderDecoder::default().wrap(ReadBuf::new(&buf), 0);
    let mut evolving = EvolvingDecoder::default().header(header, 0)?;
    assert_eq!(evolving.acting_version, 1);
    assert_eq!(evolving.acting_block_length, 8);

    assert_eq!(evolving.id(), 42);
    assert_eq!(evolving.rating(), Some(1.5));
    assert_eq!(evolving.flags(), u16::MAX);
    assert_eq!(evolving.tag(), [0_u8; 4]);
    assert_eq!(evolving.grade(), Model::NullVal);
    assert!(matches!(evolving.engine_decoder(), Either::Left(_)));

    let mut revisions = evolving.revisions_decoder();
    assert_eq!(revisions.count(), 0);
    assert_eq!(revisions.advance()?, None);
    evolving = revisions.parent()?;

    assert_eq!(evolving.remark(), b"");
    assert_eq!(evolving.encoded_length(), 8);
    Ok(())
}

#[test]
fn test_version_zero_hides_rating() {
    let buf = version_one_buffer();
    let evolving = EvolvingDecoder::default().wrap(ReadBuf::new(&buf[..12]), 8, 4, 0);
    assert_eq!(evolving.id(), 42);
    assert_eq!(evolving.rating(), None);
}

#[test]
fn test_current_version_round_trip() -> SbeResult<()> {
    let mut buf = [0_u8; 64];
    let mut evolving =
        EvolvingEncoder::default().wrap(WriteBuf::new(&mut buf), message_header_codec::ENCODED_LENGTH);
    evolving = evolving.header(0).parent()?;
    evolving.id(7);
    evolving.rating(f32::NAN);
    evolving.flags(3);
    evolving.tag(*b"v2.0");
    evolving.grade(Model::B);
    let mut engine = evolving.engine_encoder();
    engine.capacity(1600);
    evolving = engine.parent()?;
    let mut revisions = evolving.revisions_encoder(2);
    for number in [10, 11] {
        revisions.advance()?;
        revisions.number(number);
    }
    evolving = revisions.parent()?;
    evolving.remark("current")?;
    let written = message_header_codec::ENCODED_LENGTH + evolving.encoded_length();

    let header = MessageHeaderDecoder::default().wrap(ReadBuf::new(&buf), 0);
    let mut evolving = EvolvingDecoder::default().header(header, 0)?;
    assert_eq!(evolving.acting_version, SCHEMA_VERSION);
    assert_eq!(evolving.id(), 7);
    assert_eq!(evolving.rating(), None);
    assert_eq!(evolving.flags(), 3);
    assert_eq!(evolving.tag(), *b"v2.0");
    assert_eq!(evolving.grade(), Model::B);
    match evolving.engine_decoder() {
        Either::Right(engine) => assert_eq!(engine.capacity(), 1600),
        Either::Left(_) => panic!("engine hidden at the current version"),
    }

    let mut revisions = evolving.revisions_decoder();
    let mut numbers = Vec::new();
    while revisions.advance()?.is_some() {
        numbers.push(revisions.number());
    }
    evolving = revisions.parent()?;
    assert_eq!(numbers, vec![10_u16, 11]);
    assert_eq!(evolving.remark(), b"current");
    assert_eq!(message_header_codec::ENCODED_LENGTH + evolving.encoded_length(), written);
    Ok(())
}
