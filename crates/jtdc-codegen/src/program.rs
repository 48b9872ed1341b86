//! # Program: Shared Unit Resolution
//!
//! Turns a checked [`Document`] into a [`Program`]: one independently
//! invokable unit for the root schema and one per definition. All three
//! back-ends run over the same program and differ only in what they do
//! per node.
//!
//! ## Invariants
//!
//! - Unit 0 is the root; definitions follow in name order.
//! - A `ref` compiles to [`NodeKind::Ref`] holding the target [`UnitId`].
//!   It is an invocation of that unit, never an inline copy, so recursive
//!   and mutually recursive definitions produce a finite program.
//! - Every node stores its absolute schema path. Units for definitions
//!   start at `/definitions/<name>`, which is where a ref's errors point.
//!   The validator reports errors without walking the schema again.
//! - Property and mapping lookups are precomputed into hash indexes.

use std::collections::{HashMap, HashSet};

use jtdc_core::{JsonPointer, SchemaDigest, SchemaError, SchemaErrorKind};
use jtdc_schema::{Document, Form, Properties, Schema, TypeKind};

/// Index of a unit inside its program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitId(usize);

impl UnitId {
    /// The root unit.
    pub const ROOT: UnitId = UnitId(0);

    /// Position of the unit in [`Program::units`].
    pub fn index(&self) -> usize {
        self.0
    }
}

/// What a unit was generated from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitName {
    /// The document root.
    Root,
    /// A named definition.
    Definition(String),
}

impl std::fmt::Display for UnitName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Root => f.write_str("#"),
            Self::Definition(name) => write!(f, "#/definitions/{name}"),
        }
    }
}

/// One named, independently invokable generation unit.
#[derive(Debug)]
pub struct Unit {
    name: UnitName,
    pub(crate) node: Node,
}

impl Unit {
    /// What this unit was generated from.
    pub fn name(&self) -> &UnitName {
        &self.name
    }
}

/// A compiled schema: its document, digest and units.
#[derive(Debug)]
pub struct Program {
    digest: SchemaDigest,
    document: Document,
    units: Vec<Unit>,
}

impl Program {
    /// Generate the units for `document`.
    ///
    /// # Errors
    ///
    /// Returns `SchemaErrorKind::UnresolvedRef` if a `ref` names no
    /// definition of `document`.
    pub fn generate(document: Document, digest: SchemaDigest) -> Result<Self, SchemaError> {
        let units = Generator::new(&document).units()?;
        Ok(Self {
            digest,
            document,
            units,
        })
    }

    /// Digest of the canonical schema document.
    pub fn digest(&self) -> SchemaDigest {
        self.digest
    }

    /// The checked schema document this program was generated from.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// All units; index 0 is the root.
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    /// Look up a definition's unit by name.
    pub fn unit_for(&self, definition: &str) -> Option<UnitId> {
        self.units
            .iter()
            .position(|u| matches!(&u.name, UnitName::Definition(n) if n == definition))
            .map(UnitId)
    }

    pub(crate) fn root(&self) -> &Node {
        &self.units[UnitId::ROOT.0].node
    }

    pub(crate) fn unit(&self, id: UnitId) -> &Node {
        &self.units[id.0].node
    }
}

struct Generator<'a> {
    document: &'a Document,
    ids: HashMap<&'a str, UnitId>,
}

impl<'a> Generator<'a> {
    fn new(document: &'a Document) -> Self {
        let ids = document
            .definitions()
            .keys()
            .enumerate()
            .map(|(i, name)| (name.as_str(), UnitId(i + 1)))
            .collect();
        Self { document, ids }
    }

    fn units(&self) -> Result<Vec<Unit>, SchemaError> {
        let mut units = Vec::with_capacity(self.ids.len() + 1);
        units.push(Unit {
            name: UnitName::Root,
            node: self.node(self.document.root(), JsonPointer::root())?,
        });
        for (name, schema) in self.document.definitions() {
            units.push(Unit {
                name: UnitName::Definition(name.clone()),
                node: self.node(schema, JsonPointer::from_segments(["definitions", name.as_str()]))?,
            });
        }
        Ok(units)
    }

    fn resolve(&self, name: &str, path: &JsonPointer) -> Result<UnitId, SchemaError> {
        match (self.document.definition(name), self.ids.get(name)) {
            (Some(_), Some(id)) => Ok(*id),
            _ => Err(SchemaError::new(
                path.child("ref"),
                SchemaErrorKind::UnresolvedRef(name.to_string()),
            )),
        }
    }

    fn node(&self, schema: &Schema, path: JsonPointer) -> Result<Node, SchemaError> {
        let kind = match &schema.form {
            Form::Empty => NodeKind::Empty,
            Form::Ref { name } => NodeKind::Ref(self.resolve(name, &path)?),
            Form::Type { kind } => NodeKind::Type(*kind),
            Form::Enum { values } => NodeKind::Enum(EnumNode {
                lookup: values.iter().cloned().collect(),
            }),
            Form::Elements { item } => NodeKind::Elements(Box::new(self.node(item, path.child("elements"))?)),
            Form::Values { item } => NodeKind::Values(Box::new(self.node(item, path.child("values"))?)),
            Form::Properties(props) => NodeKind::Properties(self.properties(props, &path)?),
            Form::Discriminator { tag, mapping } => {
                let mapping_path = path.child("mapping");
                let branches = mapping
                    .iter()
                    .map(|(tag_value, branch)| {
                        let branch_path = mapping_path.child(tag_value.as_str());
                        Ok(Branch {
                            tag_value: tag_value.clone(),
                            properties: self.properties(&branch.properties, &branch_path)?,
                            schema_path: branch_path,
                        })
                    })
                    .collect::<Result<Vec<Branch>, SchemaError>>()?;
                let index = branches
                    .iter()
                    .enumerate()
                    .map(|(i, b)| (b.tag_value.clone(), i))
                    .collect();
                NodeKind::Discriminator(DiscriminatorNode {
                    tag: tag.clone(),
                    branches,
                    index,
                })
            }
        };
        Ok(Node {
            nullable: schema.nullable,
            schema_path: path,
            kind,
        })
    }

    fn properties(&self, props: &Properties, path: &JsonPointer) -> Result<PropertiesNode, SchemaError> {
        let members = |members: &[(String, Schema)], keyword: &str| -> Result<Vec<Member>, SchemaError> {
            let base = path.child(keyword);
            members
                .iter()
                .map(|(name, schema)| {
                    Ok(Member {
                        name: name.clone(),
                        node: self.node(schema, base.child(name.as_str()))?,
                    })
                })
                .collect()
        };
        let required = members(&props.required, "properties")?;
        let optional = members(&props.optional, "optionalProperties")?;
        let index = required
            .iter()
            .enumerate()
            .map(|(i, m)| (m.name.clone(), Slot::Required(i)))
            .chain(
                optional
                    .iter()
                    .enumerate()
                    .map(|(i, m)| (m.name.clone(), Slot::Optional(i))),
            )
            .collect();
        Ok(PropertiesNode {
            required,
            optional,
            additional: props.additional,
            container_keyword: props.container_keyword(),
            index,
        })
    }
}

/// A compiled schema node.
#[derive(Debug)]
pub(crate) struct Node {
    pub nullable: bool,
    pub schema_path: JsonPointer,
    pub kind: NodeKind,
}

#[derive(Debug)]
pub(crate) enum NodeKind {
    Empty,
    Ref(UnitId),
    Type(TypeKind),
    Enum(EnumNode),
    Elements(Box<Node>),
    Values(Box<Node>),
    Properties(PropertiesNode),
    Discriminator(DiscriminatorNode),
}

#[derive(Debug)]
pub(crate) struct EnumNode {
    pub lookup: HashSet<String>,
}

impl EnumNode {
    pub fn contains(&self, value: &str) -> bool {
        self.lookup.contains(value)
    }
}

#[derive(Debug)]
pub(crate) struct Member {
    pub name: String,
    pub node: Node,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Slot {
    Required(usize),
    Optional(usize),
}

#[derive(Debug)]
pub(crate) struct PropertiesNode {
    pub required: Vec<Member>,
    pub optional: Vec<Member>,
    pub additional: bool,
    pub container_keyword: &'static str,
    pub index: HashMap<String, Slot>,
}

impl PropertiesNode {
    pub fn member(&self, slot: Slot) -> &Member {
        match slot {
            Slot::Required(i) => &self.required[i],
            Slot::Optional(i) => &self.optional[i],
        }
    }
}

#[derive(Debug)]
pub(crate) struct Branch {
    pub tag_value: String,
    pub schema_path: JsonPointer,
    pub properties: PropertiesNode,
}

#[derive(Debug)]
pub(crate) struct DiscriminatorNode {
    pub tag: String,
    pub branches: Vec<Branch>,
    pub index: HashMap<String, usize>,
}

impl DiscriminatorNode {
    pub fn branch(&self, tag_value: &str) -> Option<&Branch> {
        self.index.get(tag_value).map(|&i| &self.branches[i])
    }
}
