use std::collections::BTreeMap;

use indexmap::IndexMap;

use crate::ast::Location;
use crate::error::AsmErrorKind;

/// Where a label was declared. Temp labels (`@name`) collect one address per
/// declaration, kept in ascending order.
#[derive(Debug, Clone)]
pub struct LabelDeclaration {
    pub addresses: Vec<i64>,
    pub location: Location,
}

/// A use of a still-unbound name, recorded at the address of the action using it.
#[derive(Debug, Clone)]
pub struct LabelReference {
    pub name: String,
    pub address: i64,
    pub location: Location,
}

/// A contiguous run of emitted bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeChunk {
    pub start: i64,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct Segment {
    pub name: String,
    pub start: i64,
    pub size: i64,
    pub end: i64,
    /// Negative when the segment is not part of the output image.
    pub file_offset: i64,
    pub location: Location,
    pub global_all: bool,
    pub last_build_address: i64,
    bytes: BTreeMap<i64, u8>,
    labels: IndexMap<String, LabelDeclaration>,
    references: Vec<LabelReference>,
}

impl Segment {
    pub fn new(name: String, start: i64, size: i64, file_offset: i64, location: Location) -> Self {
        Self {
            name,
            start,
            size,
            end: start + size,
            file_offset,
            location,
            global_all: false,
            last_build_address: start,
            bytes: BTreeMap::new(),
            labels: IndexMap::new(),
            references: Vec::new(),
        }
    }

    pub fn label(&self, name: &str) -> Option<&LabelDeclaration> {
        self.labels.get(name)
    }

    pub fn labels(&self) -> impl Iterator<Item = (&str, &LabelDeclaration)> {
        self.labels.iter().map(|(name, declaration)| (name.as_str(), declaration))
    }

    pub fn declare_label(&mut self, name: &str, address: i64, location: &Location) {
        self.labels.insert(
            name.to_string(),
            LabelDeclaration {
                addresses: vec![address],
                location: location.clone(),
            },
        );
    }

    /// Adds another address to an existing temp label. Returns false when `name`
    /// has not been declared in this segment yet.
    pub fn redeclare_temp_label(&mut self, name: &str, address: i64) -> bool {
        let Some(declaration) = self.labels.get_mut(name) else {
            return false;
        };
        declaration.addresses.push(address);
        declaration.addresses.sort_unstable();
        true
    }

    pub fn add_reference(&mut self, name: &str, address: i64, location: &Location) {
        self.references.push(LabelReference {
            name: name.to_string(),
            address,
            location: location.clone(),
        });
    }

    pub fn references(&self) -> &[LabelReference] {
        &self.references
    }

    pub fn set_bytes(&mut self, address: i64, bytes: &[u8]) -> Result<(), AsmErrorKind> {
        for (offset, byte) in bytes.iter().enumerate() {
            let at = address + offset as i64;
            if self.bytes.insert(at, *byte).is_some() {
                return Err(AsmErrorKind::ByteOverlap {
                    segment: self.name.clone(),
                    address: at,
                });
            }
        }
        Ok(())
    }

    pub fn clear_bytes(&mut self) {
        self.bytes.clear();
    }

    /// Emitted bytes split into runs at every address gap.
    pub fn code_chunks(&self) -> Vec<CodeChunk> {
        let mut chunks: Vec<CodeChunk> = Vec::new();
        for (&address, &byte) in &self.bytes {
            match chunks.last_mut() {
                Some(chunk) if chunk.start + chunk.bytes.len() as i64 == address => {
                    chunk.bytes.push(byte);
                }
                _ => chunks.push(CodeChunk {
                    start: address,
                    bytes: vec![byte],
                }),
            }
        }
        chunks
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
    Nearest,
}

/// Splits the `+`/`-` search suffix off a temp label reference.
pub fn split_direction(name: &str) -> (&str, Direction) {
    if !name.starts_with('@') {
        return (name, Direction::Nearest);
    }
    if let Some(stem) = name.strip_suffix('+') {
        (stem, Direction::Forward)
    } else if let Some(stem) = name.strip_suffix('-') {
        (stem, Direction::Backward)
    } else {
        (name, Direction::Nearest)
    }
}

/// Picks the declaration a reference at `reference` means.
///
/// With a single address that address is used. Otherwise a reference between two
/// declarations, or on one that has another after it, needs a direction; `None`
/// means the reference is ambiguous.
pub fn resolve_address(addresses: &[i64], reference: i64, direction: Direction) -> Option<i64> {
    let last = addresses.len().checked_sub(1)?;
    let mut index = 0;
    while index < last && reference > addresses[index] {
        index += 1;
    }

    let current = addresses[index];
    if reference < current && index > 0 {
        match direction {
            Direction::Backward => Some(addresses[index - 1]),
            Direction::Forward => Some(current),
            Direction::Nearest => None,
        }
    } else if reference == current && index < last {
        match direction {
            Direction::Backward => Some(current),
            Direction::Forward => Some(addresses[index + 1]),
            Direction::Nearest => None,
        }
    } else {
        Some(current)
    }
}
