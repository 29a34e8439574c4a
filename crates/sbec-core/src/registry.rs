//! Registry of named types.
//!
//! Every enum, bit set and composite is collected once, before any code is
//! emitted, together with the types its members reference. Emission then walks
//! the registry in dependency order, so each named type is generated exactly
//! once no matter how many messages refer to it.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::ir::{Ir, Signal, Token};
use tracing::debug;

/// Category of a named type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// `BEGIN_ENUM` run
    Enum,
    /// `BEGIN_SET` run
    BitSet,
    /// `BEGIN_COMPOSITE` run
    Composite,
}

impl TypeKind {
    fn from_signal(signal: Signal) -> Option<Self> {
        match signal {
            Signal::BeginEnum => Some(TypeKind::Enum),
            Signal::BeginSet => Some(TypeKind::BitSet),
            Signal::BeginComposite => Some(TypeKind::Composite),
            _ => None,
        }
    }
}

/// A named type and the tokens defining it
#[derive(Debug, Clone)]
pub struct NamedType<'ir> {
    /// Schema name
    pub name: String,
    /// Category
    pub kind: TypeKind,
    /// The defining run, begin and end tokens included
    pub tokens: &'ir [Token],
    /// Names of the types referenced by direct members
    pub dependencies: Vec<String>,
}

/// Immutable set of named types in emission order
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry<'ir> {
    types: Vec<NamedType<'ir>>,
    index: HashMap<String, usize>,
    order: Vec<usize>,
}

impl<'ir> TypeRegistry<'ir> {
    /// Collects the named types of `ir` and orders them by dependency.
    ///
    /// Types are taken from `ir.types` first and then from message field
    /// subtrees. The first definition of a name wins.
    pub fn build(ir: &'ir Ir) -> Result<Self> {
        let mut registry = Self::default();
        for tokens in ir.types.iter().chain(ir.messages.iter()) {
            registry.scan(tokens)?;
        }
        registry.order = registry.topological_order()?;
        debug!(types = registry.types.len(), "built type registry");
        Ok(registry)
    }

    fn scan(&mut self, tokens: &'ir [Token]) -> Result<()> {
        let mut index = 0;
        while index < tokens.len() {
            let token = &tokens[index];
            let Some(kind) = TypeKind::from_signal(token.signal) else {
                index += 1;
                continue;
            };

            let span = token.component_token_count;
            if span < 2 || index + span > tokens.len() {
                return Err(Error::malformed(
                    &token.name,
                    format!("type run of {span} tokens exceeds its token list"),
                ));
            }
            let run = &tokens[index..index + span];

            let synthetic = index > 0
                && matches!(
                    tokens[index - 1].signal,
                    Signal::BeginGroup | Signal::BeginVarData
                );
            if synthetic {
                index += span;
                continue;
            }

            if kind == TypeKind::Composite && token.encoded_length < 0 {
                debug!(name = %token.name, "skipping variable length composite");
                index += span;
                continue;
            }

            self.insert(kind, run);
            // Composites are descended into so nested types are found
            index += if kind == TypeKind::Composite { 1 } else { span };
        }
        Ok(())
    }

    fn insert(&mut self, kind: TypeKind, run: &'ir [Token]) {
        let name = run[0].applicable_type_name().to_string();
        if self.index.contains_key(&name) {
            debug!(%name, "duplicate type definition ignored");
            return;
        }

        let dependencies = match kind {
            TypeKind::Composite => direct_dependencies(run),
            TypeKind::Enum | TypeKind::BitSet => Vec::new(),
        };
        self.index.insert(name.clone(), self.types.len());
        self.types.push(NamedType {
            name,
            kind,
            tokens: run,
            dependencies,
        });
    }

    /// Kahn's algorithm with ties broken by first appearance
    fn topological_order(&self) -> Result<Vec<usize>> {
        let mut emitted = vec![false; self.types.len()];
        let mut order = Vec::with_capacity(self.types.len());

        while order.len() < self.types.len() {
            let ready = (0..self.types.len()).find(|&i| {
                !emitted[i]
                    && self.types[i].dependencies.iter().all(|dep| {
                        self.index.get(dep).map_or(true, |&d| emitted[d])
                    })
            });
            match ready {
                Some(i) => {
                    emitted[i] = true;
                    order.push(i);
                }
                None => {
                    let stuck = (0..self.types.len()).find(|&i| !emitted[i]).unwrap_or(0);
                    return Err(Error::TypeCycle {
                        name: self.types[stuck].name.clone(),
                    });
                }
            }
        }
        Ok(order)
    }

    /// Looks up a named type
    pub fn get(&self, name: &str) -> Option<&NamedType<'ir>> {
        self.index.get(name).map(|&i| &self.types[i])
    }

    /// Looks up a named type, failing if it is unknown
    pub fn require(&self, name: &str) -> Result<&NamedType<'ir>> {
        self.get(name).ok_or_else(|| Error::MissingType {
            name: name.to_string(),
        })
    }

    /// Named types in emission order, dependencies first
    pub fn ordered(&self) -> impl Iterator<Item = &NamedType<'ir>> + '_ {
        self.order.iter().map(move |&i| &self.types[i])
    }

    /// Number of named types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns true if no named types were found
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

fn direct_dependencies(run: &[Token]) -> Vec<String> {
    let mut dependencies = Vec::new();
    let mut index = 1;
    while index + 1 < run.len() {
        let token = &run[index];
        if TypeKind::from_signal(token.signal).is_some() {
            let name = token.applicable_type_name().to_string();
            if !dependencies.contains(&name) {
                dependencies.push(name);
            }
            index += token.component_token_count.max(1);
        } else {
            index += 1;
        }
    }
    dependencies
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::builder::{
        CompositeDef, EnumDef, FieldDef, GroupDef, MessageDef, SchemaBuilder, SetDef, VarDataDef,
        MESSAGE_HEADER,
    };
    use crate::ir::PrimitiveType;
    use pretty_assertions::assert_eq;

    fn names<'a>(registry: &'a TypeRegistry<'_>) -> Vec<&'a str> {
        registry.ordered().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn test_dependencies_emitted_first() {
        let ir = SchemaBuilder::new("test")
            .composite(
                CompositeDef::new("Engine")
                    .member("capacity", PrimitiveType::Uint16)
                    .member("booster", "Booster"),
            )
            .composite(
                CompositeDef::new("Booster")
                    .member("kind", "BoostType")
                    .member("horsePower", PrimitiveType::Uint8),
            )
            .enumeration(EnumDef::new("BoostType", PrimitiveType::Char).value("TURBO", "T"))
            .set(SetDef::new("Extras", PrimitiveType::Uint8).choice("sunRoof", 0))
            .build()
            .unwrap();

        let registry = TypeRegistry::build(&ir).unwrap();
        assert_eq!(
            names(&registry),
            vec![MESSAGE_HEADER, "BoostType", "Booster", "Engine", "Extras"]
        );
        assert_eq!(registry.require("Engine").unwrap().dependencies, vec!["Booster"]);
        assert_eq!(registry.require("Extras").unwrap().kind, TypeKind::BitSet);
    }

    #[test]
    fn test_group_and_var_data_composites_excluded() {
        let ir = SchemaBuilder::new("test")
            .message(
                MessageDef::new("M", 1)
                    .group(GroupDef::new("entries", 2).field(FieldDef::new("v", 3, PrimitiveType::Int32)))
                    .var_data(VarDataDef::bytes("blob", 4)),
            )
            .build()
            .unwrap();

        let registry = TypeRegistry::build(&ir).unwrap();
        assert_eq!(names(&registry), vec![MESSAGE_HEADER]);
        assert!(registry.get("groupSizeEncoding").is_none());
        assert!(registry.get("varDataEncoding").is_none());
    }

    #[test]
    fn test_first_definition_wins() {
        let mut ir = SchemaBuilder::new("test")
            .enumeration(EnumDef::new("Flag", PrimitiveType::Uint8).value("No", "0"))
            .build()
            .unwrap();
        let mut other = ir.types[1].clone();
        other[0].encoded_length = 99;
        ir.types.push(other);

        let registry = TypeRegistry::build(&ir).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.require("Flag").unwrap().tokens[0].encoded_length, 1);
    }

    #[test]
    fn test_types_found_in_messages_only() {
        let mut ir = SchemaBuilder::new("test")
            .enumeration(EnumDef::new("Side", PrimitiveType::Char).value("Buy", "B"))
            .message(MessageDef::new("Order", 1).field(FieldDef::new("side", 1, "Side")))
            .build()
            .unwrap();
        ir.types.truncate(1);

        let registry = TypeRegistry::build(&ir).unwrap();
        assert_eq!(names(&registry), vec![MESSAGE_HEADER, "Side"]);
    }

    #[test]
    fn test_cycle_and_missing() {
        let mut ir = SchemaBuilder::new("test")
            .composite(CompositeDef::new("Inner").member("x", PrimitiveType::Uint8))
            .composite(CompositeDef::new("Outer").member("inner", "Inner"))
            .build()
            .unwrap();
        // Nest Outer inside Inner so each references the other
        let outer = ir.types[2].clone();
        ir.types[1].splice(1..2, outer);
        ir.types[1][0].component_token_count = ir.types[1].len();

        let err = TypeRegistry::build(&ir).unwrap_err();
        assert!(matches!(err, Error::TypeCycle { .. }));

        let ir = SchemaBuilder::new("test").build().unwrap();
        let registry = TypeRegistry::build(&ir).unwrap();
        assert!(matches!(registry.require("Nope"), Err(Error::MissingType { .. })));
    }
}
