//! Programmatic IR construction.
//!
//! [`SchemaBuilder`] lays out messages the way a schema parser would: field
//! offsets follow declaration order, block lengths and component token counts
//! are computed, and named types are inlined wherever they are referenced.
//!
//! ```
//! use sbec_core::ir::builder::{FieldDef, MessageDef, SchemaBuilder, VarDataDef};
//! use sbec_core::ir::PrimitiveType;
//!
//! let ir = SchemaBuilder::new("example")
//!     .id(7)
//!     .message(
//!         MessageDef::new("Ping", 1)
//!             .field(FieldDef::new("seq", 1, PrimitiveType::Uint32))
//!             .var_data(VarDataDef::utf8("note", 2)),
//!     )
//!     .build()?;
//! assert_eq!(ir.messages[0][0].encoded_length, 4);
//! # Ok::<(), sbec_core::Error>(())
//! ```

use super::{
    ByteOrder, Encoding, HeaderStructure, Ir, Presence, PrimitiveType, Signal, Token,
};
use crate::error::{Error, Result};

/// Name of the standard message header composite
pub const MESSAGE_HEADER: &str = "messageHeader";

/// A primitive encoding, standalone or inline
#[derive(Debug, Clone, PartialEq)]
pub struct EncodingDef {
    name: String,
    primitive: PrimitiveType,
    length: usize,
    presence: Presence,
    null_value: Option<String>,
    min_value: Option<String>,
    max_value: Option<String>,
    const_value: Option<String>,
    character_encoding: Option<String>,
    semantic_type: Option<String>,
}

impl EncodingDef {
    /// Creates a required scalar encoding
    pub fn new(name: impl Into<String>, primitive: PrimitiveType) -> Self {
        Self {
            name: name.into(),
            primitive,
            length: 1,
            presence: Presence::Required,
            null_value: None,
            min_value: None,
            max_value: None,
            const_value: None,
            character_encoding: (primitive == PrimitiveType::Char).then(|| "US-ASCII".to_string()),
            semantic_type: None,
        }
    }

    /// Makes this a fixed length array
    pub fn array(mut self, length: usize) -> Self {
        self.length = length.max(1);
        self
    }

    /// Marks the encoding optional
    pub fn optional(mut self) -> Self {
        self.presence = Presence::Optional;
        self
    }

    /// Overrides the null sentinel
    pub fn null_value(mut self, value: impl Into<String>) -> Self {
        self.null_value = Some(value.into());
        self
    }

    /// Overrides the minimum value
    pub fn min_value(mut self, value: impl Into<String>) -> Self {
        self.min_value = Some(value.into());
        self
    }

    /// Overrides the maximum value
    pub fn max_value(mut self, value: impl Into<String>) -> Self {
        self.max_value = Some(value.into());
        self
    }

    /// Makes this a constant that never occupies wire bytes
    pub fn constant(mut self, value: impl Into<String>) -> Self {
        self.presence = Presence::Constant;
        self.const_value = Some(value.into());
        self
    }

    /// Sets the character encoding
    pub fn character_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.character_encoding = Some(encoding.into());
        self
    }

    /// Sets the semantic type
    pub fn semantic_type(mut self, semantic_type: impl Into<String>) -> Self {
        self.semantic_type = Some(semantic_type.into());
        self
    }

    fn encoded_length(&self) -> usize {
        if self.presence == Presence::Constant {
            0
        } else {
            self.primitive.size() * self.length
        }
    }

    fn encoding(&self) -> Encoding {
        Encoding {
            presence: self.presence,
            primitive_type: Some(self.primitive),
            min_value: self.min_value.clone(),
            max_value: self.max_value.clone(),
            null_value: self.null_value.clone(),
            const_value: self.const_value.clone(),
            character_encoding: self.character_encoding.clone(),
            semantic_type: self.semantic_type.clone(),
        }
    }
}

/// An enum type
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDef {
    name: String,
    primitive: PrimitiveType,
    values: Vec<(String, String)>,
}

impl EnumDef {
    /// Creates an enum encoded as the given primitive
    pub fn new(name: impl Into<String>, primitive: PrimitiveType) -> Self {
        Self {
            name: name.into(),
            primitive,
            values: Vec::new(),
        }
    }

    /// Adds a value
    pub fn value(mut self, name: impl Into<String>, literal: impl Into<String>) -> Self {
        self.values.push((name.into(), literal.into()));
        self
    }
}

/// A bit set type
#[derive(Debug, Clone, PartialEq)]
pub struct SetDef {
    name: String,
    primitive: PrimitiveType,
    choices: Vec<(String, u32)>,
}

impl SetDef {
    /// Creates a bit set stored in the given primitive
    pub fn new(name: impl Into<String>, primitive: PrimitiveType) -> Self {
        Self {
            name: name.into(),
            primitive,
            choices: Vec::new(),
        }
    }

    /// Adds a choice at a bit index
    pub fn choice(mut self, name: impl Into<String>, bit: u32) -> Self {
        self.choices.push((name.into(), bit));
        self
    }
}

/// A composite type
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeDef {
    name: String,
    members: Vec<(String, TypeRef)>,
}

impl CompositeDef {
    /// Creates an empty composite
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
        }
    }

    /// Appends a member
    pub fn member(mut self, name: impl Into<String>, ty: impl Into<TypeRef>) -> Self {
        self.members.push((name.into(), ty.into()));
        self
    }
}

/// A named type
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDef {
    /// Named primitive encoding
    Encoding(EncodingDef),
    /// Enum
    Enum(EnumDef),
    /// Bit set
    Set(SetDef),
    /// Composite
    Composite(CompositeDef),
}

impl TypeDef {
    /// Name of the type
    pub fn name(&self) -> &str {
        match self {
            TypeDef::Encoding(def) => &def.name,
            TypeDef::Enum(def) => &def.name,
            TypeDef::Set(def) => &def.name,
            TypeDef::Composite(def) => &def.name,
        }
    }
}

/// Reference to the type of a field or composite member
#[derive(Debug, Clone, PartialEq)]
pub enum TypeRef {
    /// An inline primitive encoding
    Primitive(EncodingDef),
    /// A type registered on the builder
    Named(String),
}

impl From<PrimitiveType> for TypeRef {
    fn from(primitive: PrimitiveType) -> Self {
        TypeRef::Primitive(EncodingDef::new(primitive.name(), primitive))
    }
}

impl From<EncodingDef> for TypeRef {
    fn from(def: EncodingDef) -> Self {
        TypeRef::Primitive(def)
    }
}

impl From<&str> for TypeRef {
    fn from(name: &str) -> Self {
        TypeRef::Named(name.to_string())
    }
}

/// A message or group field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    name: String,
    id: i32,
    ty: TypeRef,
    since_version: u32,
    constant: Option<String>,
}

impl FieldDef {
    /// Creates a field of the given type
    pub fn new(name: impl Into<String>, id: i32, ty: impl Into<TypeRef>) -> Self {
        Self {
            name: name.into(),
            id,
            ty: ty.into(),
            since_version: 0,
            constant: None,
        }
    }

    /// Sets the version in which the field was introduced
    pub fn since_version(mut self, version: u32) -> Self {
        self.since_version = version;
        self
    }

    /// Makes an enum typed field constant, e.g. `Model.C`
    pub fn constant_value(mut self, value: impl Into<String>) -> Self {
        self.constant = Some(value.into());
        self
    }
}

/// A variable length data member
#[derive(Debug, Clone, PartialEq)]
pub struct VarDataDef {
    name: String,
    id: i32,
    since_version: u32,
    length_type: PrimitiveType,
    character_encoding: Option<String>,
}

impl VarDataDef {
    /// Creates a UTF-8 text member
    pub fn utf8(name: impl Into<String>, id: i32) -> Self {
        Self::bytes(name, id).character_encoding("UTF-8")
    }

    /// Creates a raw byte member
    pub fn bytes(name: impl Into<String>, id: i32) -> Self {
        Self {
            name: name.into(),
            id,
            since_version: 0,
            length_type: PrimitiveType::Uint16,
            character_encoding: None,
        }
    }

    /// Sets the character encoding
    pub fn character_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.character_encoding = Some(encoding.into());
        self
    }

    /// Sets the type of the length prefix
    pub fn length_type(mut self, primitive: PrimitiveType) -> Self {
        self.length_type = primitive;
        self
    }

    /// Sets the version in which the member was introduced
    pub fn since_version(mut self, version: u32) -> Self {
        self.since_version = version;
        self
    }
}

/// Fields, groups and var data of a message or group
#[derive(Debug, Clone, Default, PartialEq)]
struct BodyDef {
    fields: Vec<FieldDef>,
    groups: Vec<GroupDef>,
    var_data: Vec<VarDataDef>,
}

/// A repeating group
#[derive(Debug, Clone, PartialEq)]
pub struct GroupDef {
    name: String,
    id: i32,
    since_version: u32,
    block_length_type: PrimitiveType,
    num_in_group_type: PrimitiveType,
    body: BodyDef,
}

impl GroupDef {
    /// Creates an empty group with a `u16` dimension header
    pub fn new(name: impl Into<String>, id: i32) -> Self {
        Self {
            name: name.into(),
            id,
            since_version: 0,
            block_length_type: PrimitiveType::Uint16,
            num_in_group_type: PrimitiveType::Uint16,
            body: BodyDef::default(),
        }
    }

    /// Sets the version in which the group was introduced
    pub fn since_version(mut self, version: u32) -> Self {
        self.since_version = version;
        self
    }

    /// Sets the types of the dimension header
    pub fn dimension(mut self, block_length: PrimitiveType, num_in_group: PrimitiveType) -> Self {
        self.block_length_type = block_length;
        self.num_in_group_type = num_in_group;
        self
    }

    /// Appends a field
    pub fn field(mut self, field: FieldDef) -> Self {
        self.body.fields.push(field);
        self
    }

    /// Appends a nested group
    pub fn group(mut self, group: GroupDef) -> Self {
        self.body.groups.push(group);
        self
    }

    /// Appends a var data member
    pub fn var_data(mut self, var_data: VarDataDef) -> Self {
        self.body.var_data.push(var_data);
        self
    }
}

/// A message
#[derive(Debug, Clone, PartialEq)]
pub struct MessageDef {
    name: String,
    id: i32,
    body: BodyDef,
}

impl MessageDef {
    /// Creates an empty message with a template id
    pub fn new(name: impl Into<String>, id: i32) -> Self {
        Self {
            name: name.into(),
            id,
            body: BodyDef::default(),
        }
    }

    /// Appends a field
    pub fn field(mut self, field: FieldDef) -> Self {
        self.body.fields.push(field);
        self
    }

    /// Appends a group
    pub fn group(mut self, group: GroupDef) -> Self {
        self.body.groups.push(group);
        self
    }

    /// Appends a var data member
    pub fn var_data(mut self, var_data: VarDataDef) -> Self {
        self.body.var_data.push(var_data);
        self
    }
}

/// Where a type's tokens are placed
struct Placement<'p> {
    name: &'p str,
    referenced_name: Option<&'p str>,
    offset: usize,
    version: u32,
    constant: Option<&'p str>,
    depth: usize,
}

/// Builds an [`Ir`]
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    package_name: String,
    namespace_name: Option<String>,
    id: u32,
    version: u32,
    semantic_version: Option<String>,
    description: Option<String>,
    byte_order: ByteOrder,
    standard_header: bool,
    types: Vec<TypeDef>,
    messages: Vec<MessageDef>,
}

impl SchemaBuilder {
    /// Creates a builder for the given package
    pub fn new(package_name: impl Into<String>) -> Self {
        Self {
            package_name: package_name.into(),
            namespace_name: None,
            id: 0,
            version: 0,
            semantic_version: None,
            description: None,
            byte_order: ByteOrder::LittleEndian,
            standard_header: true,
            types: Vec::new(),
            messages: Vec::new(),
        }
    }

    /// Sets the namespace name
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace_name = Some(namespace.into());
        self
    }

    /// Sets the schema id
    pub fn id(mut self, id: u32) -> Self {
        self.id = id;
        self
    }

    /// Sets the schema version
    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Sets the semantic version string
    pub fn semantic_version(mut self, semantic_version: impl Into<String>) -> Self {
        self.semantic_version = Some(semantic_version.into());
        self
    }

    /// Sets the description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the wire byte order
    pub fn byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    /// Omits the standard `messageHeader` composite
    pub fn without_standard_header(mut self) -> Self {
        self.standard_header = false;
        self
    }

    /// Registers a named primitive encoding
    pub fn encoding(mut self, def: EncodingDef) -> Self {
        self.types.push(TypeDef::Encoding(def));
        self
    }

    /// Registers an enum
    pub fn enumeration(mut self, def: EnumDef) -> Self {
        self.types.push(TypeDef::Enum(def));
        self
    }

    /// Registers a bit set
    pub fn set(mut self, def: SetDef) -> Self {
        self.types.push(TypeDef::Set(def));
        self
    }

    /// Registers a composite
    pub fn composite(mut self, def: CompositeDef) -> Self {
        self.types.push(TypeDef::Composite(def));
        self
    }

    /// Appends a message
    pub fn message(mut self, def: MessageDef) -> Self {
        self.messages.push(def);
        self
    }

    /// Lays out every type and message into token lists
    pub fn build(mut self) -> Result<Ir> {
        if self.standard_header && !self.types.iter().any(|t| t.name() == MESSAGE_HEADER) {
            self.types.insert(
                0,
                TypeDef::Composite(
                    CompositeDef::new(MESSAGE_HEADER)
                        .member("blockLength", PrimitiveType::Uint16)
                        .member("templateId", PrimitiveType::Uint16)
                        .member("schemaId", PrimitiveType::Uint16)
                        .member("version", PrimitiveType::Uint16),
                ),
            );
        }

        let mut types = Vec::with_capacity(self.types.len());
        for def in &self.types {
            let mut tokens = Vec::new();
            let placement = Placement {
                name: def.name(),
                referenced_name: None,
                offset: 0,
                version: 0,
                constant: None,
                depth: 0,
            };
            self.type_tokens(def, &placement, &mut tokens)?;
            types.push(tokens);
        }

        let mut messages = Vec::with_capacity(self.messages.len());
        for def in &self.messages {
            messages.push(self.message_tokens(def)?);
        }

        Ok(Ir {
            package_name: self.package_name,
            namespace_name: self.namespace_name,
            id: self.id,
            version: self.version,
            semantic_version: self.semantic_version,
            description: self.description,
            byte_order: self.byte_order,
            header_structure: HeaderStructure::default(),
            types,
            messages,
        })
    }

    fn lookup(&self, name: &str) -> Result<&TypeDef> {
        self.types
            .iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| Error::MissingType {
                name: name.to_string(),
            })
    }

    fn message_tokens(&self, def: &MessageDef) -> Result<Vec<Token>> {
        let mut tokens = vec![Token::new(Signal::BeginMessage, &def.name)];
        let block_length = self.body_tokens(&def.body, &mut tokens)?;
        tokens.push(Token::new(Signal::EndMessage, &def.name));

        let count = tokens.len();
        let begin = &mut tokens[0];
        begin.id = def.id;
        begin.offset = 0;
        begin.encoded_length = block_length as i32;
        begin.component_token_count = count;
        tokens[count - 1].component_token_count = 1;
        Ok(tokens)
    }

    /// Appends the body tokens and returns the fixed block length
    fn body_tokens(&self, body: &BodyDef, out: &mut Vec<Token>) -> Result<usize> {
        let mut offset = 0;
        for field in &body.fields {
            offset += self.field_tokens(field, offset, out)?;
        }
        for group in &body.groups {
            self.group_tokens(group, out)?;
        }
        for var_data in &body.var_data {
            var_data_tokens(var_data, out);
        }
        Ok(offset)
    }

    fn field_tokens(&self, field: &FieldDef, offset: usize, out: &mut Vec<Token>) -> Result<usize> {
        let begin = out.len();
        out.push(Token::new(Signal::BeginField, &field.name));

        let constant = field.constant.as_deref();
        let length = match &field.ty {
            TypeRef::Primitive(def) => {
                let placement = Placement {
                    name: &def.name,
                    referenced_name: None,
                    offset,
                    version: field.since_version,
                    constant,
                    depth: 0,
                };
                encoding_tokens(def, &placement, out)
            }
            TypeRef::Named(name) => {
                let def = self.lookup(name)?;
                let placement = Placement {
                    name: def.name(),
                    referenced_name: None,
                    offset,
                    version: field.since_version,
                    constant,
                    depth: 0,
                };
                self.type_tokens(def, &placement, out)?
            }
        };

        let mut end = Token::new(Signal::EndField, &field.name);
        end.version = field.since_version;
        out.push(end);

        let type_encoding = out[begin + 1].encoding.clone();
        let count = out.len() - begin;
        let token = &mut out[begin];
        token.id = field.id;
        token.offset = offset as i32;
        token.version = field.since_version;
        token.encoded_length = length as i32;
        token.component_token_count = count;
        token.encoding.presence = type_encoding.presence;
        token.encoding.const_value = match constant {
            Some(value) => Some(value.to_string()),
            None if type_encoding.presence == Presence::Constant => type_encoding.const_value,
            None => None,
        };
        Ok(length)
    }

    fn group_tokens(&self, group: &GroupDef, out: &mut Vec<Token>) -> Result<()> {
        let begin = out.len();
        out.push(Token::new(Signal::BeginGroup, &group.name));

        let block_size = group.block_length_type.size();
        let mut dimension = Token::new(Signal::BeginComposite, "groupSizeEncoding");
        dimension.offset = 0;
        dimension.version = group.since_version;
        dimension.encoded_length = (block_size + group.num_in_group_type.size()) as i32;
        dimension.component_token_count = 4;
        out.push(dimension);
        for (name, primitive, offset) in [
            ("blockLength", group.block_length_type, 0),
            ("numInGroup", group.num_in_group_type, block_size),
        ] {
            let placement = Placement {
                name,
                referenced_name: None,
                offset,
                version: group.since_version,
                constant: None,
                depth: 0,
            };
            encoding_tokens(&EncodingDef::new(name, primitive), &placement, out);
        }
        out.push(Token::new(Signal::EndComposite, "groupSizeEncoding"));

        let block_length = self.body_tokens(&group.body, out)?;
        out.push(Token::new(Signal::EndGroup, &group.name));

        let count = out.len() - begin;
        let token = &mut out[begin];
        token.id = group.id;
        token.version = group.since_version;
        token.encoded_length = block_length as i32;
        token.component_token_count = count;
        Ok(())
    }

    /// Appends the tokens of a named type and returns its encoded length
    fn type_tokens(&self, def: &TypeDef, at: &Placement<'_>, out: &mut Vec<Token>) -> Result<usize> {
        match def {
            TypeDef::Encoding(def) => Ok(encoding_tokens(def, at, out)),
            TypeDef::Enum(def) => {
                if def.values.is_empty() {
                    return Err(Error::EmptyEnum {
                        name: def.name.clone(),
                    });
                }
                let encoding = Encoding {
                    presence: if at.constant.is_some() {
                        Presence::Constant
                    } else {
                        Presence::Required
                    },
                    primitive_type: Some(def.primitive),
                    const_value: at.constant.map(str::to_string),
                    ..Encoding::default()
                };
                let members = def.values.iter().map(|(name, value)| {
                    let mut token = Token::new(Signal::ValidValue, name);
                    token.version = at.version;
                    token.encoded_length = def.primitive.size() as i32;
                    token.encoding.primitive_type = Some(def.primitive);
                    token.encoding.const_value = Some(value.clone());
                    token
                });
                let length = if at.constant.is_some() { 0 } else { def.primitive.size() };
                wrap_run(Signal::BeginEnum, Signal::EndEnum, at, length, encoding, members, out);
                Ok(length)
            }
            TypeDef::Set(def) => {
                let encoding = Encoding {
                    primitive_type: Some(def.primitive),
                    ..Encoding::default()
                };
                let members = def.choices.iter().map(|(name, bit)| {
                    let mut token = Token::new(Signal::Choice, name);
                    token.version = at.version;
                    token.encoded_length = def.primitive.size() as i32;
                    token.encoding.primitive_type = Some(def.primitive);
                    token.encoding.const_value = Some(bit.to_string());
                    token
                });
                let length = def.primitive.size();
                wrap_run(Signal::BeginSet, Signal::EndSet, at, length, encoding, members, out);
                Ok(length)
            }
            TypeDef::Composite(def) => {
                if at.depth > self.types.len() {
                    return Err(Error::TypeCycle {
                        name: def.name.clone(),
                    });
                }
                let begin = out.len();
                let mut token = Token::new(Signal::BeginComposite, at.name);
                token.referenced_name = at.referenced_name.map(str::to_string);
                token.offset = at.offset as i32;
                token.version = at.version;
                out.push(token);

                let mut offset = 0;
                for (member, ty) in &def.members {
                    offset += match ty {
                        TypeRef::Primitive(encoding) => {
                            let placement = Placement {
                                name: member,
                                referenced_name: None,
                                offset,
                                version: at.version,
                                constant: None,
                                depth: at.depth + 1,
                            };
                            encoding_tokens(encoding, &placement, out)
                        }
                        TypeRef::Named(name) => {
                            let nested = self.lookup(name)?;
                            let placement = Placement {
                                name: member,
                                referenced_name: Some(nested.name()),
                                offset,
                                version: at.version,
                                constant: None,
                                depth: at.depth + 1,
                            };
                            self.type_tokens(nested, &placement, out)?
                        }
                    };
                }

                let mut end = Token::new(Signal::EndComposite, at.name);
                end.version = at.version;
                out.push(end);

                let count = out.len() - begin;
                out[begin].encoded_length = offset as i32;
                out[begin].component_token_count = count;
                Ok(offset)
            }
        }
    }
}

fn encoding_tokens(def: &EncodingDef, at: &Placement<'_>, out: &mut Vec<Token>) -> usize {
    let mut token = Token::new(Signal::Encoding, at.name);
    token.referenced_name = at.referenced_name.map(str::to_string);
    token.offset = at.offset as i32;
    token.version = at.version;
    token.encoded_length = def.encoded_length() as i32;
    token.encoding = def.encoding();
    out.push(token);
    def.encoded_length()
}

fn wrap_run(
    begin_signal: Signal,
    end_signal: Signal,
    at: &Placement<'_>,
    length: usize,
    encoding: Encoding,
    members: impl Iterator<Item = Token>,
    out: &mut Vec<Token>,
) {
    let begin = out.len();
    let mut token = Token::new(begin_signal, at.name);
    token.referenced_name = at.referenced_name.map(str::to_string);
    token.offset = at.offset as i32;
    token.version = at.version;
    token.encoded_length = length as i32;
    token.encoding = encoding.clone();
    out.push(token);
    out.extend(members);

    let mut end = Token::new(end_signal, at.name);
    end.version = at.version;
    end.encoding = encoding;
    out.push(end);
    out[begin].component_token_count = out.len() - begin;
}

fn var_data_tokens(def: &VarDataDef, out: &mut Vec<Token>) {
    let mut begin = Token::new(Signal::BeginVarData, &def.name);
    begin.id = def.id;
    begin.version = def.since_version;
    begin.component_token_count = 6;
    out.push(begin);

    let composite_name = if def.character_encoding.is_some() {
        "varStringEncoding"
    } else {
        "varDataEncoding"
    };
    let mut composite = Token::new(Signal::BeginComposite, composite_name);
    composite.version = def.since_version;
    composite.component_token_count = 4;
    out.push(composite);

    let prefix_size = def.length_type.size();
    let mut length = Token::new(Signal::Encoding, "length");
    length.offset = 0;
    length.version = def.since_version;
    length.encoded_length = prefix_size as i32;
    length.encoding.primitive_type = Some(def.length_type);
    out.push(length);

    let mut data = Token::new(Signal::Encoding, "varData");
    data.offset = prefix_size as i32;
    data.version = def.since_version;
    data.encoding.primitive_type = Some(PrimitiveType::Uint8);
    data.encoding.character_encoding = def.character_encoding.clone();
    out.push(data);

    out.push(Token::new(Signal::EndComposite, composite_name));
    let mut end = Token::new(Signal::EndVarData, &def.name);
    end.version = def.since_version;
    out.push(end);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn signals(tokens: &[Token]) -> Vec<Signal> {
        tokens.iter().map(|t| t.signal).collect()
    }

    #[test]
    fn test_message_layout() {
        let ir = SchemaBuilder::new("test")
            .enumeration(EnumDef::new("BooleanType", PrimitiveType::Uint8).value("F", "0").value("T", "1"))
            .message(
                MessageDef::new("Order", 3)
                    .field(FieldDef::new("price", 1, PrimitiveType::Int64))
                    .field(FieldDef::new("flag", 2, "BooleanType"))
                    .field(FieldDef::new("fixed", 3, EncodingDef::new("fixed", PrimitiveType::Uint16).constant("7")))
                    .field(FieldDef::new("qty", 4, PrimitiveType::Uint32)),
            )
            .build()
            .unwrap();

        let tokens = &ir.messages[0];
        assert_eq!(tokens[0].encoded_length, 13);
        assert_eq!(tokens[0].component_token_count, tokens.len());
        let offsets: Vec<i32> = tokens
            .iter()
            .filter(|t| t.signal == Signal::BeginField)
            .map(|t| t.offset)
            .collect();
        assert_eq!(offsets, vec![0, 8, 9, 9]);

        let flag = tokens.iter().position(|t| t.name == "flag").unwrap();
        assert_eq!(tokens[flag].component_token_count, 6);
        assert_eq!(
            signals(&tokens[flag..flag + 6]),
            vec![
                Signal::BeginField,
                Signal::BeginEnum,
                Signal::ValidValue,
                Signal::ValidValue,
                Signal::EndEnum,
                Signal::EndField,
            ]
        );
    }

    #[test]
    fn test_group_and_var_data_layout() {
        let ir = SchemaBuilder::new("test")
            .message(
                MessageDef::new("Batch", 1)
                    .group(
                        GroupDef::new("entries", 2)
                            .field(FieldDef::new("id", 3, PrimitiveType::Uint32))
                            .var_data(VarDataDef::utf8("label", 4)),
                    )
                    .var_data(VarDataDef::bytes("blob", 5).length_type(PrimitiveType::Uint32)),
            )
            .build()
            .unwrap();

        let tokens = &ir.messages[0];
        assert_eq!(tokens[0].encoded_length, 0);
        let group = &tokens[1];
        assert_eq!(group.signal, Signal::BeginGroup);
        assert_eq!(group.encoded_length, 4);
        assert_eq!(group.component_token_count, 1 + 4 + 3 + 6 + 1);
        assert_eq!(tokens[2].component_token_count, 4);

        let blob = tokens.iter().position(|t| t.name == "blob").unwrap();
        assert_eq!(tokens[blob + 2].encoding.primitive_type, Some(PrimitiveType::Uint32));
        assert_eq!(tokens[blob + 3].offset, 4);
        assert_eq!(tokens[blob + 3].encoding.character_encoding, None);
    }

    #[test]
    fn test_standard_header_and_composites() {
        let ir = SchemaBuilder::new("test")
            .composite(
                CompositeDef::new("Engine")
                    .member("capacity", PrimitiveType::Uint16)
                    .member("code", EncodingDef::new("code", PrimitiveType::Char).array(3)),
            )
            .build()
            .unwrap();

        assert_eq!(ir.types.len(), 2);
        assert_eq!(ir.types[0][0].name, MESSAGE_HEADER);
        assert_eq!(ir.types[0][0].encoded_length, 8);
        let engine = &ir.types[1];
        assert_eq!(engine[0].encoded_length, 5);
        assert_eq!(engine[2].offset, 2);
        assert_eq!(engine[2].array_length(), 3);
    }

    #[test]
    fn test_missing_and_empty_types() {
        let err = SchemaBuilder::new("test")
            .message(MessageDef::new("M", 1).field(FieldDef::new("x", 1, "Nope")))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::MissingType { .. }));

        let err = SchemaBuilder::new("test")
            .enumeration(EnumDef::new("Empty", PrimitiveType::Uint8))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::EmptyEnum { .. }));
    }
}
