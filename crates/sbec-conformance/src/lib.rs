//! Generated codecs of the reference `car` schema.
//!
//! `build.rs` compiles the schema with sbec-core on every build, so the
//! integration tests under `tests/` always exercise the current generator.
//! The schema is compiled twice, with and without doc comments, so both
//! renderings have to build.

#[allow(dead_code, unused_imports, unused_mut, non_camel_case_types, clippy::all)]
pub mod car {
    include!(concat!(env!("OUT_DIR"), "/car.rs"));
}

#[allow(dead_code, unused_imports, unused_mut, non_camel_case_types, clippy::all)]
pub mod car_bare {
    include!(concat!(env!("OUT_DIR"), "/car_bare.rs"));
}
