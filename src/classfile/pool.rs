//! Constant pool parsing and lookups
//!
//! The pool is parsed eagerly into a flat vector. Only the entry kinds the
//! extractor resolves (Utf8, Class, Methodref, InterfaceMethodref,
//! NameAndType) are retained; everything else is consumed and stored as
//! `Other` so later indices stay valid. Long and Double occupy two slots
//! per the JVM specification, so a filler entry follows them.

use crate::error::ClassParseError;

use super::reader::ClassReader;

#[derive(Debug, Clone)]
pub enum Constant {
    Utf8(String),
    Class { name_index: u16 },
    MethodRef { class_index: u16, name_and_type_index: u16 },
    NameAndType { name_index: u16, descriptor_index: u16 },
    Other,
    Unusable,
}

pub struct ConstantPool {
    entries: Vec<Constant>,
}

impl ConstantPool {
    pub fn parse(reader: &mut ClassReader<'_>) -> Result<Self, ClassParseError> {
        let count = reader.read_u2()? as usize;
        let mut entries = Vec::with_capacity(count);
        entries.push(Constant::Unusable); // index 0 unused

        let mut index = 1;
        while index < count {
            let tag = reader.read_u1()?;
            let entry = match tag {
                // CONSTANT_Utf8
                1 => {
                    let length = reader.read_u2()? as usize;
                    let bytes = reader.read_slice(length)?;
                    // Modified UTF-8 differs from UTF-8 only for NUL and
                    // supplementary characters, neither of which occurs in
                    // identifiers or descriptors; fall back lossily so a
                    // stray string constant cannot fail the whole class.
                    let string = String::from_utf8_lossy(bytes).into_owned();
                    Constant::Utf8(string)
                }
                // CONSTANT_Integer, CONSTANT_Float
                3 | 4 => {
                    reader.skip(4)?;
                    Constant::Other
                }
                // CONSTANT_Long, CONSTANT_Double (two slots)
                5 | 6 => {
                    reader.skip(8)?;
                    entries.push(Constant::Other);
                    index += 1;
                    Constant::Unusable
                }
                // CONSTANT_Class
                7 => {
                    let name_index = reader.read_u2()?;
                    Constant::Class { name_index }
                }
                // CONSTANT_String
                8 => {
                    reader.read_u2()?;
                    Constant::Other
                }
                // CONSTANT_Fieldref
                9 => {
                    reader.skip(4)?;
                    Constant::Other
                }
                // CONSTANT_Methodref, CONSTANT_InterfaceMethodref
                10 | 11 => {
                    let class_index = reader.read_u2()?;
                    let name_and_type_index = reader.read_u2()?;
                    Constant::MethodRef {
                        class_index,
                        name_and_type_index,
                    }
                }
                // CONSTANT_NameAndType
                12 => {
                    let name_index = reader.read_u2()?;
                    let descriptor_index = reader.read_u2()?;
                    Constant::NameAndType {
                        name_index,
                        descriptor_index,
                    }
                }
                // CONSTANT_MethodHandle
                15 => {
                    reader.skip(3)?;
                    Constant::Other
                }
                // CONSTANT_MethodType
                16 => {
                    reader.read_u2()?;
                    Constant::Other
                }
                // CONSTANT_Dynamic, CONSTANT_InvokeDynamic
                17 | 18 => {
                    reader.skip(4)?;
                    Constant::Other
                }
                // CONSTANT_Module, CONSTANT_Package
                19 | 20 => {
                    reader.read_u2()?;
                    Constant::Other
                }
                other => return Err(ClassParseError::UnsupportedConstant { tag: other }),
            };

            entries.push(entry);
            index += 1;
        }

        Ok(Self { entries })
    }

    pub fn get(&self, index: u16) -> Result<&Constant, ClassParseError> {
        self.entries
            .get(index as usize)
            .ok_or(ClassParseError::InvalidConstantIndex { index })
    }

    pub fn utf8(&self, index: u16) -> Result<&str, ClassParseError> {
        match self.get(index)? {
            Constant::Utf8(value) => Ok(value.as_str()),
            _ => Err(ClassParseError::InvalidConstantIndex { index }),
        }
    }

    /// Internal (slash-separated) name of a CONSTANT_Class entry.
    pub fn class_name(&self, index: u16) -> Result<&str, ClassParseError> {
        match self.get(index)? {
            Constant::Class { name_index } => self.utf8(*name_index),
            _ => Err(ClassParseError::InvalidConstantIndex { index }),
        }
    }

    /// Resolve a Methodref or InterfaceMethodref to (owner, name, descriptor),
    /// all still in internal form.
    pub fn method_ref(&self, index: u16) -> Result<(&str, &str, &str), ClassParseError> {
        match self.get(index)? {
            Constant::MethodRef {
                class_index,
                name_and_type_index,
            } => {
                let owner = self.class_name(*class_index)?;
                match self.get(*name_and_type_index)? {
                    Constant::NameAndType {
                        name_index,
                        descriptor_index,
                    } => {
                        let name = self.utf8(*name_index)?;
                        let descriptor = self.utf8(*descriptor_index)?;
                        Ok((owner, name, descriptor))
                    }
                    _ => Err(ClassParseError::InvalidConstantIndex {
                        index: *name_and_type_index,
                    }),
                }
            }
            _ => Err(ClassParseError::InvalidConstantIndex { index }),
        }
    }
}
