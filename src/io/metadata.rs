//! Entity metadata blob: a sequence of tagged entries terminated by a
//! `0x7F` sentinel byte. Each entry's tag byte packs a primitive
//! selector in its high 3 bits and a key in its low 5 bits.

use super::item::Item;
use super::{PacketReader, PacketWriter};
use crate::error::Result;

/// Sentinel byte that ends a metadata blob.
pub const END_OF_METADATA: u8 = 0x7F;

/// The payload carried by one metadata entry, keyed by the primitive
/// selector in the entry's tag byte.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    /// Selector `0`.
    Byte(i8),
    /// Selector `1`.
    Short(i16),
    /// Selector `2`.
    Int(i32),
    /// Selector `3`.
    Float(f32),
    /// Selector `4`.
    Text(String),
    /// Selector `5`.
    ItemSlot(Item),
    /// Selector `6`: three packed `i32`s (historically a block position).
    Triple(i32, i32, i32),
}

/// One entry of a metadata blob: a 5-bit key plus its typed value.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataEntry {
    /// Low 5 bits of the tag byte.
    pub key: u8,
    /// Value selected by the high 3 bits of the tag byte.
    pub value: MetadataValue,
}

/// A full metadata blob: zero or more entries, terminated on the wire by
/// [`END_OF_METADATA`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetadataBlob {
    /// Entries in wire order.
    pub entries: Vec<MetadataEntry>,
}

impl MetadataEntry {
    fn selector(&self) -> u8 {
        match self.value {
            MetadataValue::Byte(_) => 0,
            MetadataValue::Short(_) => 1,
            MetadataValue::Int(_) => 2,
            MetadataValue::Float(_) => 3,
            MetadataValue::Text(_) => 4,
            MetadataValue::ItemSlot(_) => 5,
            MetadataValue::Triple(..) => 6,
        }
    }

    async fn read(reader: &mut PacketReader, tag: u8) -> Result<Self> {
        let selector = tag >> 5;
        let key = tag & 0x1F;
        let value = match selector {
            0 => MetadataValue::Byte(reader.read_i8().await?),
            1 => MetadataValue::Short(reader.read_i16().await?),
            2 => MetadataValue::Int(reader.read_i32().await?),
            3 => MetadataValue::Float(reader.read_f32().await?),
            4 => MetadataValue::Text(reader.read_utf16().await?),
            5 => MetadataValue::ItemSlot(Item::read(reader).await?),
            6 => {
                let a = reader.read_i32().await?;
                let b = reader.read_i32().await?;
                let c = reader.read_i32().await?;
                MetadataValue::Triple(a, b, c)
            }
            other => {
                return Err(crate::error::TunnelError::ProtocolDesync {
                    opcode: 0,
                    previous: None,
                    reason: format!("unknown metadata selector {other}"),
                });
            }
        };
        Ok(Self { key, value })
    }

    async fn write(&self, writer: &mut PacketWriter) -> Result<()> {
        let tag = (self.selector() << 5) | (self.key & 0x1F);
        writer.write_u8(tag).await?;
        match &self.value {
            MetadataValue::Byte(v) => {
                writer.write_i8(*v).await?;
            }
            MetadataValue::Short(v) => {
                writer.write_i16(*v).await?;
            }
            MetadataValue::Int(v) => {
                writer.write_i32(*v).await?;
            }
            MetadataValue::Float(v) => {
                writer.write_f32(*v).await?;
            }
            MetadataValue::Text(v) => {
                writer.write_utf16(v).await?;
            }
            MetadataValue::ItemSlot(item) => {
                item.clone().write(writer).await?;
            }
            MetadataValue::Triple(a, b, c) => {
                writer.write_i32(*a).await?;
                writer.write_i32(*b).await?;
                writer.write_i32(*c).await?;
            }
        }
        Ok(())
    }
}

impl MetadataBlob {
    /// Read entries until the `0x7F` sentinel.
    pub async fn read(reader: &mut PacketReader) -> Result<Self> {
        let mut entries = Vec::new();
        loop {
            let tag = reader.read_u8().await?;
            if tag == END_OF_METADATA {
                break;
            }
            entries.push(MetadataEntry::read(reader, tag).await?);
        }
        Ok(Self { entries })
    }

    /// Write entries followed by the `0x7F` sentinel.
    pub async fn write(&self, writer: &mut PacketWriter) -> Result<()> {
        for entry in &self.entries {
            entry.write(writer).await?;
        }
        writer.write_u8(END_OF_METADATA).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::test_support::{reader_over, vec_writer};

    #[tokio::test]
    async fn blob_roundtrip_all_selectors() {
        let blob = MetadataBlob {
            entries: vec![
                MetadataEntry { key: 0, value: MetadataValue::Byte(-3) },
                MetadataEntry { key: 1, value: MetadataValue::Short(1000) },
                MetadataEntry { key: 2, value: MetadataValue::Int(-70000) },
                MetadataEntry { key: 3, value: MetadataValue::Float(1.25) },
                MetadataEntry { key: 4, value: MetadataValue::Text("hi".into()) },
                MetadataEntry {
                    key: 5,
                    value: MetadataValue::ItemSlot(Item {
                        id: 1,
                        detail: Some(crate::io::item::ItemDetail {
                            count: 1,
                            damage: 0,
                            nbt_len: 0,
                            nbt: vec![],
                        }),
                    }),
                },
                MetadataEntry { key: 6, value: MetadataValue::Triple(1, 2, 3) },
            ],
        };
        let (mut writer, buf) = vec_writer();
        blob.write(&mut writer).await.unwrap();
        let bytes = buf.lock().unwrap().clone();
        assert_eq!(*bytes.last().unwrap(), END_OF_METADATA);
        let mut reader = reader_over(bytes);
        let decoded = MetadataBlob::read(&mut reader).await.unwrap();
        assert_eq!(blob, decoded);
    }

    #[tokio::test]
    async fn empty_blob_is_just_the_sentinel() {
        let blob = MetadataBlob::default();
        let (mut writer, buf) = vec_writer();
        blob.write(&mut writer).await.unwrap();
        assert_eq!(*buf.lock().unwrap(), vec![END_OF_METADATA]);
    }
}
