//! Compiles the reference schemas into `OUT_DIR` with sbec-core.

use anyhow::{Context, Result};
use sbec_core::ir::builder::{
    CompositeDef, EncodingDef, EnumDef, FieldDef, GroupDef, MessageDef, SchemaBuilder, SetDef,
    VarDataDef,
};
use sbec_core::{CodecGenerator, GeneratorConfig, Ir, MemorySink, OutputLayout, PrimitiveType};
use std::path::PathBuf;

fn car_schema() -> sbec_core::Result<Ir> {
    SchemaBuilder::new("car")
        .id(1)
        .version(2)
        .semantic_version("5.2")
        .enumeration(
            EnumDef::new("BooleanType", PrimitiveType::Uint8)
                .value("F", "0")
                .value("T", "1"),
        )
        .enumeration(
            EnumDef::new("Model", PrimitiveType::Char)
                .value("A", "A")
                .value("B", "B")
                .value("C", "C"),
        )
        .enumeration(
            EnumDef::new("BoostType", PrimitiveType::Char)
                .value("TURBO", "T")
                .value("SUPERCHARGER", "S")
                .value("NITROUS", "N")
                .value("KERS", "K"),
        )
        .set(
            SetDef::new("OptionalExtras", PrimitiveType::Uint8)
                .choice("sunRoof", 0)
                .choice("sportsPack", 1)
                .choice("cruiseControl", 2),
        )
        .composite(
            CompositeDef::new("Booster")
                .member("boostType", "BoostType")
                .member("horsePower", PrimitiveType::Uint8),
        )
        .composite(
            CompositeDef::new("Engine")
                .member("capacity", PrimitiveType::Uint16)
                .member("numCylinders", PrimitiveType::Uint8)
                .member("maxRpm", EncodingDef::new("maxRpm", PrimitiveType::Uint16).constant("9000"))
                .member(
                    "manufacturerCode",
                    EncodingDef::new("manufacturerCode", PrimitiveType::Char).array(3),
                )
                .member("fuel", EncodingDef::new("fuel", PrimitiveType::Char).array(6).constant("Petrol"))
                .member("efficiency", PrimitiveType::Int8)
                .member("boosterEnabled", "BooleanType")
                .member("booster", "Booster"),
        )
        .message(
            MessageDef::new("Car", 1)
                .field(FieldDef::new("serialNumber", 1, PrimitiveType::Uint64))
                .field(FieldDef::new("modelYear", 2, PrimitiveType::Uint16))
                .field(FieldDef::new("available", 3, "BooleanType"))
                .field(FieldDef::new("code", 4, "Model"))
                .field(FieldDef::new(
                    "someNumbers",
                    5,
                    EncodingDef::new("someNumbers", PrimitiveType::Uint32).array(4),
                ))
                .field(FieldDef::new(
                    "vehicleCode",
                    6,
                    EncodingDef::new("vehicleCode", PrimitiveType::Char).array(6),
                ))
                .field(FieldDef::new("extras", 7, "OptionalExtras"))
                .field(FieldDef::new("discountedModel", 8, "Model").constant_value("Model.C"))
                .field(FieldDef::new("engine", 9, "Engine"))
                .field(FieldDef::new(
                    "fuelEconomy",
                    10,
                    EncodingDef::new("fuelEconomy", PrimitiveType::Float).optional(),
                ))
                .field(FieldDef::new(
                    "mileage",
                    11,
                    EncodingDef::new("mileage", PrimitiveType::Uint32).optional(),
                ))
                .field(FieldDef::new(
                    "rebate",
                    12,
                    EncodingDef::new("rebate", PrimitiveType::Int16).optional(),
                ))
                .group(
                    GroupDef::new("fuelFigures", 13)
                        .field(FieldDef::new("speed", 14, PrimitiveType::Uint16))
                        .field(FieldDef::new("mpg", 15, PrimitiveType::Float))
                        .var_data(VarDataDef::utf8("usageDescription", 16)),
                )
                .group(
                    GroupDef::new("performanceFigures", 17)
                        .field(FieldDef::new("octaneRating", 18, PrimitiveType::Uint8))
                        .group(
                            GroupDef::new("acceleration", 19)
                                .field(FieldDef::new("mph", 20, PrimitiveType::Uint16))
                                .field(FieldDef::new("seconds", 21, PrimitiveType::Float)),
                        ),
                )
                .var_data(VarDataDef::utf8("manufacturer", 22))
                .var_data(VarDataDef::utf8("model", 23))
                .var_data(VarDataDef::bytes("activationCode", 24)),
        )
        .message(
            MessageDef::new("Evolving", 2)
                .field(FieldDef::new("id", 1, PrimitiveType::Uint32))
                .field(
                    FieldDef::new("rating", 2, EncodingDef::new("rating", PrimitiveType::Float).optional())
                        .since_version(1),
                )
                .field(FieldDef::new("flags", 3, PrimitiveType::Uint16).since_version(2))
                .field(
                    FieldDef::new("tag", 4, EncodingDef::new("tag", PrimitiveType::Char).array(4))
                        .since_version(2),
                )
                .field(FieldDef::new("grade", 5, "Model").since_version(2))
                .field(FieldDef::new("engine", 6, "Engine").since_version(2))
                .group(
                    GroupDef::new("revisions", 7)
                        .since_version(2)
                        .field(FieldDef::new("number", 8, PrimitiveType::Uint16)),
                )
                .var_data(VarDataDef::utf8("remark", 9).since_version(2)),
        )
        .message(
            MessageDef::new("Route", 3)
                .field(FieldDef::new("routeId", 1, PrimitiveType::Uint32))
                .group(
                    GroupDef::new("legs", 2)
                        .field(FieldDef::new("distance", 3, PrimitiveType::Uint32))
                        .group(
                            GroupDef::new("stops", 4)
                                .dimension(PrimitiveType::Uint16, PrimitiveType::Uint8)
                                .field(FieldDef::new("minutes", 5, PrimitiveType::Uint16))
                                .var_data(VarDataDef::bytes("note", 6)),
                        ),
                ),
        )
        .message(
            MessageDef::new("Plain", 4)
                .field(FieldDef::new("left", 1, PrimitiveType::Uint32))
                .field(FieldDef::new("right", 2, PrimitiveType::Uint16)),
        )
        .message(
            MessageDef::new("Decorated", 5)
                .field(FieldDef::new("left", 1, PrimitiveType::Uint32))
                .field(FieldDef::new("ceiling", 2, EncodingDef::new("ceiling", PrimitiveType::Uint16).constant("500")))
                .field(FieldDef::new("right", 3, PrimitiveType::Uint16))
                .field(FieldDef::new("grade", 4, "Model").constant_value("Model.B")),
        )
        .build()
}

/// Writes the single-file codecs of `ir` to `OUT_DIR/<file>`
fn write_codecs(ir: &Ir, emit_docs: bool, file: &str) -> Result<()> {
    let generator = CodecGenerator::new(ir)
        .context("Failed to prepare the car schema")?
        .with_config(
            GeneratorConfig::new()
                .layout(OutputLayout::SingleFile)
                .emit_docs(emit_docs),
        );

    let mut sink = MemorySink::default();
    generator.generate(&mut sink).context("Failed to generate car codecs")?;
    let source = sink
        .get(&ir.namespace())
        .context("Generator produced no single-file unit")?;

    let out_dir = PathBuf::from(std::env::var("OUT_DIR").context("OUT_DIR is not set")?);
    let path = out_dir.join(file);
    std::fs::write(&path, source).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn main() -> Result<()> {
    println!("cargo:rerun-if-changed=build.rs");

    let ir = car_schema().context("Failed to build the car schema")?;
    write_codecs(&ir, true, "car.rs")?;
    write_codecs(&ir, false, "car_bare.rs")
}
