//! The `Item` composite record: `i16 id`, and if `id >= 0` a trailing
//! `(i8 count, i16 damage, i16 nbtLen, [byte-span nbtLen])`.

use super::{PacketReader, PacketWriter};
use crate::error::Result;

/// A single inventory item slot as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Item id; negative means an empty slot, in which case no other
    /// field is present on the wire.
    pub id: i16,
    /// Present only when `id >= 0`.
    pub detail: Option<ItemDetail>,
}

/// The fields that follow a non-empty item id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDetail {
    /// Stack count.
    pub count: i8,
    /// Damage / metadata value.
    pub damage: i16,
    /// The `nbtLen` field exactly as it appeared on the wire. Values
    /// `<= 0` carry no trailing bytes but are not all equivalent — `-1`
    /// and `0` are distinct sentinels in callers' fixtures — so this is
    /// preserved and re-emitted verbatim rather than collapsed to `0`.
    pub nbt_len: i16,
    /// Raw NBT bytes; empty when `nbt_len <= 0`.
    pub nbt: Vec<u8>,
}

impl Item {
    /// An empty slot (`id = -1`).
    pub fn empty() -> Self {
        Self { id: -1, detail: None }
    }

    /// Read an item from the wire.
    pub async fn read(reader: &mut PacketReader) -> Result<Self> {
        let id = reader.read_i16().await?;
        if id < 0 {
            return Ok(Self { id, detail: None });
        }
        let count = reader.read_i8().await?;
        let damage = reader.read_i16().await?;
        let nbt_len = reader.read_i16().await?;
        let nbt = if nbt_len > 0 {
            let mut buf = vec![0u8; nbt_len as usize];
            for byte in buf.iter_mut() {
                *byte = reader.read_u8().await?;
            }
            buf
        } else {
            Vec::new()
        };
        Ok(Self {
            id,
            detail: Some(ItemDetail { count, damage, nbt_len, nbt }),
        })
    }

    /// Write an item to the wire, returning it back so callers can fold
    /// "read, remember, forward" into one expression.
    pub async fn write(self, writer: &mut PacketWriter) -> Result<Self> {
        writer.write_i16(self.id).await?;
        if let Some(detail) = &self.detail {
            writer.write_i8(detail.count).await?;
            writer.write_i16(detail.damage).await?;
            writer.write_i16(detail.nbt_len).await?;
            if detail.nbt_len > 0 {
                writer.write_bytes(&detail.nbt).await?;
            }
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::test_support::{reader_over, vec_writer};

    async fn roundtrip(item: Item) -> Item {
        let (mut writer, buf) = vec_writer();
        item.clone().write(&mut writer).await.unwrap();
        let bytes = buf.lock().unwrap().clone();
        let mut reader = reader_over(bytes);
        let decoded = Item::read(&mut reader).await.unwrap();
        assert_eq!(item, decoded);
        decoded
    }

    #[tokio::test]
    async fn empty_item_roundtrip() {
        roundtrip(Item::empty()).await;
    }

    #[tokio::test]
    async fn populated_item_roundtrip() {
        roundtrip(Item {
            id: 54,
            detail: Some(ItemDetail {
                count: 3,
                damage: 0,
                nbt_len: 4,
                nbt: vec![1, 2, 3, 4],
            }),
        })
        .await;
    }

    #[tokio::test]
    async fn zero_length_nbt_has_no_trailing_bytes() {
        roundtrip(Item {
            id: 1,
            detail: Some(ItemDetail {
                count: 1,
                damage: 0,
                nbt_len: 0,
                nbt: Vec::new(),
            }),
        })
        .await;
    }

    #[tokio::test]
    async fn negative_sentinel_nbt_len_is_preserved_through_a_roundtrip() {
        roundtrip(Item {
            id: 1,
            detail: Some(ItemDetail {
                count: 1,
                damage: 0,
                nbt_len: -1,
                nbt: Vec::new(),
            }),
        })
        .await;
    }
}
