//! Token classification.
//!
//! Partitions a token range into an ordered [`Body`] of fields, groups and
//! var-data members. Every structural run is consumed wholesale through its
//! `componentTokenCount`, so siblings stay synchronized. Groups recurse: a
//! group body is classified with the same routine.

use crate::error::{Error, Result};
use crate::ir::{Signal, Token};
use tracing::trace;

/// A fixed-offset member: scalar, array, enum, bit set or composite
#[derive(Debug, Clone, Copy)]
pub struct Field<'ir> {
    /// Token naming the field: `BEGIN_FIELD` for message fields, otherwise the type token
    pub field_token: &'ir Token,
    /// First token of the type subtree
    pub type_token: &'ir Token,
    /// The type subtree, `type_token` included
    pub type_tokens: &'ir [Token],
}

impl<'ir> Field<'ir> {
    /// Schema name of the field
    pub fn name(&self) -> &'ir str {
        &self.field_token.name
    }

    /// Version in which the field was introduced
    pub fn version(&self) -> u32 {
        self.field_token.version.max(self.type_token.version)
    }

    /// Returns true if either the field or its type is declared constant
    pub fn is_constant(&self) -> bool {
        self.field_token.is_constant() || self.type_token.is_constant()
    }
}

/// The dimension header of a group
#[derive(Debug, Clone, Copy)]
pub struct GroupHeader<'ir> {
    /// Block length encoding
    pub block_length: &'ir Token,
    /// Repeat count encoding
    pub num_in_group: &'ir Token,
}

/// A repeating group
#[derive(Debug, Clone)]
pub struct Group<'ir> {
    /// The `BEGIN_GROUP` token
    pub token: &'ir Token,
    /// Dimension header
    pub header: GroupHeader<'ir>,
    /// Classified element body
    pub body: Body<'ir>,
}

impl Group<'_> {
    /// Fixed size of the dimension header in bytes
    pub fn header_size(&self) -> Result<usize> {
        let end = |t: &Token| -> Result<usize> { Ok(t.block_offset() + t.require_primitive()?.size()) };
        Ok(end(self.header.block_length)?.max(end(self.header.num_in_group)?))
    }
}

/// A length-prefixed variable length member
#[derive(Debug, Clone, Copy)]
pub struct VarData<'ir> {
    /// The `BEGIN_VAR_DATA` token
    pub token: &'ir Token,
    /// Length prefix encoding
    pub length: &'ir Token,
    /// Payload encoding, carrying the character encoding
    pub data: &'ir Token,
}

/// One member of a body in layout order
#[derive(Debug, Clone)]
pub enum Member<'ir> {
    /// Fixed-offset field
    Field(Field<'ir>),
    /// Repeating group with its own body
    Group(Group<'ir>),
    /// Trailing variable length data
    VarData(VarData<'ir>),
}

impl Member<'_> {
    fn stage(&self) -> u8 {
        match self {
            Member::Field(_) => 0,
            Member::Group(_) => 1,
            Member::VarData(_) => 2,
        }
    }

    fn describe(stage: u8) -> &'static str {
        match stage {
            0 => "field",
            1 => "group",
            _ => "var data",
        }
    }
}

/// Classified contents of a message, group or composite
#[derive(Debug, Clone, Default)]
pub struct Body<'ir> {
    /// Members in document order: fields, then groups, then var data
    pub members: Vec<Member<'ir>>,
}

impl<'ir> Body<'ir> {
    /// Fields in declaration order
    pub fn fields(&self) -> impl Iterator<Item = &Field<'ir>> + '_ {
        self.members.iter().filter_map(|m| match m {
            Member::Field(f) => Some(f),
            _ => None,
        })
    }

    /// Groups in declaration order
    pub fn groups(&self) -> impl Iterator<Item = &Group<'ir>> + '_ {
        self.members.iter().filter_map(|m| match m {
            Member::Group(g) => Some(g),
            _ => None,
        })
    }

    /// Var data members in declaration order
    pub fn var_data(&self) -> impl Iterator<Item = &VarData<'ir>> + '_ {
        self.members.iter().filter_map(|m| match m {
            Member::VarData(v) => Some(v),
            _ => None,
        })
    }

    /// Returns true if the body holds content of variable length
    pub fn is_variable(&self) -> bool {
        self.members
            .iter()
            .any(|m| matches!(m, Member::Group(_) | Member::VarData(_)))
    }
}

/// A classified message
#[derive(Debug, Clone)]
pub struct Message<'ir> {
    /// The `BEGIN_MESSAGE` token
    pub token: &'ir Token,
    /// Message body
    pub body: Body<'ir>,
}

/// Returns the run starting at `index`, validated against its component count.
fn run<'ir>(owner: &str, tokens: &'ir [Token], index: usize) -> Result<&'ir [Token]> {
    let token = &tokens[index];
    let span = token.component_token_count;
    if span == 0 || index + span > tokens.len() {
        return Err(Error::malformed(
            owner,
            format!(
                "'{}' spans {} tokens but only {} remain",
                token.name,
                span,
                tokens.len() - index
            ),
        ));
    }

    let run = &tokens[index..index + span];
    if let Some(closing) = token.signal.closing() {
        let last = &run[span - 1];
        if span < 2 || last.signal != closing {
            return Err(Error::malformed(
                owner,
                format!(
                    "'{}' run of {} tokens ends with {:?} instead of {:?}",
                    token.name, span, last.signal, closing
                ),
            ));
        }
    }
    Ok(run)
}

/// Classifies `tokens[start..]` into a body.
///
/// Returns the body and the index immediately past the consumed range.
pub fn classify_range<'ir>(owner: &str, tokens: &'ir [Token], start: usize) -> Result<(Body<'ir>, usize)> {
    let mut body = Body::default();
    let mut stage = 0;
    let mut index = start;

    while index < tokens.len() {
        let token = &tokens[index];
        let run = run(owner, tokens, index)?;
        let member = match token.signal {
            Signal::BeginField => {
                if run.len() < 3 {
                    return Err(Error::malformed(owner, format!("field '{}' has no type", token.name)));
                }
                let type_tokens = &run[1..run.len() - 1];
                Member::Field(Field {
                    field_token: token,
                    type_token: &type_tokens[0],
                    type_tokens,
                })
            }
            Signal::Encoding | Signal::BeginEnum | Signal::BeginSet | Signal::BeginComposite => {
                Member::Field(Field {
                    field_token: token,
                    type_token: token,
                    type_tokens: run,
                })
            }
            Signal::BeginGroup => Member::Group(classify_group(run)?),
            Signal::BeginVarData => Member::VarData(classify_var_data(run)?),
            found => {
                return Err(Error::UnexpectedSignal {
                    expected: "BEGIN_FIELD, ENCODING, BEGIN_ENUM, BEGIN_SET, BEGIN_COMPOSITE, BEGIN_GROUP or BEGIN_VAR_DATA",
                    found,
                    name: token.name.clone(),
                    index,
                })
            }
        };

        let member_stage = member.stage();
        if member_stage < stage {
            return Err(Error::malformed(
                owner,
                format!(
                    "{} '{}' follows a {}",
                    Member::describe(member_stage),
                    token.name,
                    Member::describe(stage)
                ),
            ));
        }
        stage = member_stage;

        trace!(owner, member = %token.name, signal = ?token.signal, "classified member");
        body.members.push(member);
        index += run.len();
    }

    Ok((body, index))
}

/// Classifies a whole range, requiring every token to be consumed.
pub fn classify_body<'ir>(owner: &str, tokens: &'ir [Token]) -> Result<Body<'ir>> {
    let (body, next) = classify_range(owner, tokens, 0)?;
    if next != tokens.len() {
        return Err(Error::malformed(
            owner,
            format!("{} trailing tokens left unclassified", tokens.len() - next),
        ));
    }
    Ok(body)
}

/// Classifies a `[BEGIN_GROUP, header, body.., END_GROUP]` run
pub fn classify_group(run: &[Token]) -> Result<Group<'_>> {
    let token = expect(run, 0, Signal::BeginGroup, "BEGIN_GROUP")?;
    let name = token.name.as_str();
    let header_index = 1;
    let header = expect(run, header_index, Signal::BeginComposite, "BEGIN_COMPOSITE")?;
    let header_span = header.component_token_count;
    if header_span != 4 || header_index + header_span >= run.len() {
        return Err(Error::GroupHeader {
            group: name.to_string(),
            found: header_span,
        });
    }

    let header_tokens = &run[header_index..header_index + header_span];
    let find = |member: &str| {
        header_tokens
            .iter()
            .find(|t| t.signal == Signal::Encoding && t.name == member)
            .ok_or_else(|| Error::GroupHeader {
                group: name.to_string(),
                found: header_span,
            })
    };
    let header = GroupHeader {
        block_length: find("blockLength")?,
        num_in_group: find("numInGroup")?,
    };

    let body_tokens = &run[header_index + header_span..run.len() - 1];
    let body = classify_body(name, body_tokens)?;
    Ok(Group {
        token,
        header,
        body,
    })
}

/// Classifies a `[BEGIN_VAR_DATA, BEGIN_COMPOSITE, length, varData, END_COMPOSITE, END_VAR_DATA]` run
pub fn classify_var_data(run: &[Token]) -> Result<VarData<'_>> {
    let token = expect(run, 0, Signal::BeginVarData, "BEGIN_VAR_DATA")?;
    if run.len() < 6 {
        return Err(Error::malformed(
            &token.name,
            format!("var data spans {} tokens, expected 6", run.len()),
        ));
    }
    expect(run, 1, Signal::BeginComposite, "BEGIN_COMPOSITE")?;
    let length = expect(run, 2, Signal::Encoding, "ENCODING")?;
    let data = expect(run, 3, Signal::Encoding, "ENCODING")?;
    length.require_primitive()?;
    Ok(VarData {
        token,
        length,
        data,
    })
}

/// Classifies a message token list
pub fn classify_message(tokens: &[Token]) -> Result<Message<'_>> {
    let token = expect(tokens, 0, Signal::BeginMessage, "BEGIN_MESSAGE")?;
    let run = run(&token.name, tokens, 0)?;
    let body = classify_body(&token.name, &run[1..run.len() - 1])?;
    Ok(Message { token, body })
}

/// Classifies the members of a composite run; composites hold fields only
pub fn classify_composite(run: &[Token]) -> Result<Body<'_>> {
    let token = expect(run, 0, Signal::BeginComposite, "BEGIN_COMPOSITE")?;
    let run = self::run(&token.name, run, 0)?;
    let body = classify_body(&token.name, &run[1..run.len() - 1])?;
    if body.is_variable() {
        return Err(Error::malformed(
            &token.name,
            "composite contains a group or var data member",
        ));
    }
    Ok(body)
}

fn expect<'ir>(tokens: &'ir [Token], index: usize, signal: Signal, expected: &'static str) -> Result<&'ir Token> {
    match tokens.get(index) {
        Some(token) if token.signal == signal => Ok(token),
        Some(token) => Err(Error::UnexpectedSignal {
            expected,
            found: token.signal,
            name: token.name.clone(),
            index,
        }),
        None => Err(Error::malformed(
            tokens.first().map(|t| t.name.as_str()).unwrap_or("<empty>"),
            format!("missing {expected} at token {index}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::builder::{
        CompositeDef, EncodingDef, FieldDef, GroupDef, MessageDef, SchemaBuilder, VarDataDef,
    };
    use crate::ir::{Ir, PrimitiveType};

    fn sample() -> Ir {
        SchemaBuilder::new("test")
            .composite(
                CompositeDef::new("Point")
                    .member("x", PrimitiveType::Int32)
                    .member("y", PrimitiveType::Int32),
            )
            .message(
                MessageDef::new("Shape", 1)
                    .field(FieldDef::new("id", 1, PrimitiveType::Uint64))
                    .field(FieldDef::new("origin", 2, "Point"))
                    .field(FieldDef::new("kind", 3, EncodingDef::new("kind", PrimitiveType::Char).constant("S")))
                    .group(
                        GroupDef::new("vertices", 4)
                            .field(FieldDef::new("at", 5, "Point"))
                            .group(GroupDef::new("tags", 6).var_data(VarDataDef::utf8("tag", 7))),
                    )
                    .var_data(VarDataDef::utf8("label", 8)),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_classify_message() {
        let ir = sample();
        let message = classify_message(&ir.messages[0]).unwrap();
        let names: Vec<&str> = message.body.fields().map(|f| f.name()).collect();
        assert_eq!(names, vec!["id", "origin", "kind"]);
        assert!(message.body.fields().nth(2).unwrap().is_constant());

        let groups: Vec<&Group<'_>> = message.body.groups().collect();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].token.name, "vertices");
        assert_eq!(groups[0].header.num_in_group.name, "numInGroup");
        assert_eq!(groups[0].header_size().unwrap(), 4);

        let nested: Vec<&Group<'_>> = groups[0].body.groups().collect();
        assert_eq!(nested[0].token.name, "tags");
        assert_eq!(nested[0].body.var_data().count(), 1);
        assert_eq!(message.body.var_data().next().unwrap().token.name, "label");
    }

    #[test]
    fn test_classify_range_returns_next_index() {
        let ir = sample();
        let body_tokens = &ir.messages[0][1..ir.messages[0].len() - 1];
        let (body, next) = classify_range("Shape", body_tokens, 0).unwrap();
        assert_eq!(next, body_tokens.len());
        assert_eq!(body.members.len(), 5);
    }

    #[test]
    fn test_out_of_order_members_rejected() {
        let ir = sample();
        let tokens = &ir.messages[0];
        let body = &tokens[1..tokens.len() - 1];
        let group_start = body.iter().position(|t| t.signal == Signal::BeginGroup).unwrap();
        let group_len = body[group_start].component_token_count;

        let mut reordered: Vec<Token> = body[group_start..group_start + group_len].to_vec();
        reordered.extend_from_slice(&body[..group_start]);
        let err = classify_body("Shape", &reordered).unwrap_err();
        assert!(err.is_structural());
        assert!(err.to_string().contains("follows a group"));
    }

    #[test]
    fn test_bad_group_header() {
        let ir = sample();
        let tokens = &ir.messages[0];
        let start = tokens.iter().position(|t| t.signal == Signal::BeginGroup).unwrap();
        let mut run = tokens[start..start + tokens[start].component_token_count].to_vec();
        run[1].component_token_count = 3;
        let err = classify_group(&run).unwrap_err();
        assert!(matches!(err, Error::GroupHeader { found: 3, .. }));
    }

    #[test]
    fn test_unexpected_signal_and_overflow() {
        let ir = sample();
        let err = classify_body("Shape", &ir.messages[0][ir.messages[0].len() - 1..]).unwrap_err();
        assert!(matches!(err, Error::UnexpectedSignal { found: Signal::EndMessage, .. }));

        let mut tokens = ir.messages[0].clone();
        tokens[1].component_token_count = 1000;
        let err = classify_message(&tokens).unwrap_err();
        assert!(matches!(err, Error::MalformedRange { .. }));

        let err = classify_message(&ir.types[0]).unwrap_err();
        assert!(matches!(err, Error::UnexpectedSignal { expected: "BEGIN_MESSAGE", .. }));
    }

    #[test]
    fn test_classify_composite() {
        let ir = sample();
        let point = ir.types.iter().find(|t| t[0].name == "Point").unwrap();
        let body = classify_composite(point).unwrap();
        let offsets: Vec<usize> = body.fields().map(|f| f.type_token.block_offset()).collect();
        assert_eq!(offsets, vec![0, 4]);
    }
}
