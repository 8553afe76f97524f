//! The packet grammar: a table of field instructions per opcode, walked
//! by one interpreter loop for every opcode that carries no policy
//! hook. Hooked opcodes (see `crate::policy`) never consult this table;
//! everything else is pure read-and-forward, and a single miscounted
//! field here desynchronizes the stream for both tunnels.

use super::opcode;
use crate::error::Result;
use crate::io::{self, Item, MetadataBlob, PacketReader, PacketWriter};

/// One field instruction in a packet's layout.
#[derive(Clone, Copy)]
pub enum Field {
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Bool,
    Utf16,
    Item,
    MetadataBlob,
    /// A raw byte span whose length is the most recently read `i32`.
    BytesLenI32,
    /// `Item` records, repeated the most recently read `i16` times.
    ItemsLenI16,
}

/// One opcode's field layout.
pub struct PacketShape {
    pub opcode: u8,
    pub fields: &'static [Field],
}

macro_rules! shape {
    ($op:expr, [$($f:expr),* $(,)?]) => {
        PacketShape { opcode: $op, fields: &[$($f),*] }
    };
}

/// Pass-through layouts for every opcode without a policy hook. Opcodes
/// not listed here (and not dispatched to a hook) are unknown and
/// therefore fatal, per the "unknown opcodes are fatal" invariant.
pub const PASSTHROUGH_TABLE: &[PacketShape] = &[
    shape!(opcode::KEEP_ALIVE, [Field::I32]),
    shape!(opcode::TIME_UPDATE, [Field::I64]),
    shape!(
        opcode::ENTITY_EQUIPMENT,
        [Field::I32, Field::I16, Field::I16, Field::I16]
    ),
    shape!(opcode::SPAWN_POSITION, [Field::I32, Field::I32, Field::I32]),
    shape!(opcode::UPDATE_HEALTH, [Field::I16]),
    shape!(opcode::RESPAWN, [Field::I32]),
    shape!(
        opcode::PLAYER_POSITION,
        [Field::F64, Field::F64, Field::F64, Field::F64, Field::Bool]
    ),
    shape!(opcode::PLAYER_LOOK, [Field::F32, Field::F32, Field::Bool]),
    shape!(
        opcode::PLAYER_POSITION_LOOK,
        [
            Field::F64,
            Field::F64,
            Field::F64,
            Field::F64,
            Field::F32,
            Field::F32,
            Field::Bool
        ]
    ),
    shape!(opcode::BLOCK_ITEM_SWITCH, [Field::I16]),
    shape!(opcode::ANIMATION, [Field::I32, Field::I8]),
    shape!(opcode::ENTITY_ACTION, [Field::I32, Field::I8]),
    shape!(
        opcode::ENTITY_VELOCITY,
        [Field::I32, Field::I16, Field::I16, Field::I16]
    ),
    shape!(opcode::DESTROY_ENTITY, [Field::I32]),
    shape!(opcode::ENTITY, [Field::I32]),
    shape!(
        opcode::ENTITY_RELATIVE_MOVE,
        [Field::I32, Field::I8, Field::I8, Field::I8]
    ),
    shape!(opcode::ENTITY_LOOK, [Field::I32, Field::I8, Field::I8]),
    shape!(
        opcode::ENTITY_LOOK_RELATIVE_MOVE,
        [Field::I32, Field::I8, Field::I8, Field::I8, Field::I8, Field::I8]
    ),
    shape!(
        opcode::ENTITY_TELEPORT,
        [Field::I32, Field::I32, Field::I32, Field::I32, Field::I8, Field::I8]
    ),
    shape!(opcode::ENTITY_STATUS, [Field::I32, Field::I8]),
    shape!(opcode::ATTACH_ENTITY, [Field::I32, Field::I32]),
    shape!(opcode::ENTITY_METADATA, [Field::I32, Field::MetadataBlob]),
    shape!(opcode::PRE_CHUNK, [Field::I32, Field::I32, Field::Bool]),
    shape!(
        opcode::CHUNK,
        [
            Field::I32,
            Field::I16,
            Field::I32,
            Field::I8,
            Field::I8,
            Field::I8,
            Field::I32,
            Field::BytesLenI32
        ]
    ),
    shape!(
        opcode::BLOCK_ACTION,
        [Field::I32, Field::I16, Field::I32, Field::I8, Field::I8]
    ),
    shape!(opcode::NEW_STATE, [Field::I8, Field::I8]),
    shape!(opcode::CLOSE_WINDOW, [Field::I8]),
    shape!(opcode::SET_SLOT, [Field::I8, Field::I16, Field::Item]),
    shape!(
        opcode::WINDOW_ITEMS,
        [Field::I8, Field::I16, Field::ItemsLenI16]
    ),
    shape!(
        opcode::UPDATE_PROGRESS_BAR,
        [Field::I8, Field::I16, Field::I16]
    ),
    shape!(opcode::TRANSACTION, [Field::I8, Field::I16, Field::Bool]),
    shape!(
        opcode::PLAYER_LIST_ITEM,
        [Field::Utf16, Field::Bool, Field::I16]
    ),
    shape!(opcode::SERVER_LIST_PING, []),
    shape!(
        opcode::MOD_D3,
        [Field::I32, Field::I32, Field::I32, Field::I32]
    ),
    shape!(opcode::MOD_E6, [Field::I8, Field::I32]),
];

/// Find the pass-through layout for `opcode`, if any.
pub fn shape_for(opcode: u8) -> Option<&'static PacketShape> {
    PASSTHROUGH_TABLE.iter().find(|s| s.opcode == opcode)
}

/// Interpret `shape`: read each field from `reader` and immediately
/// write it to `writer`, byte for byte. The only state threaded between
/// fields is the most recently read `i32`/`i16`, needed by the
/// length-prefixed raw-span and item-array instructions.
pub async fn pass_through(
    reader: &mut PacketReader,
    writer: &mut PacketWriter,
    shape: &PacketShape,
) -> Result<()> {
    let mut last_i32: i32 = 0;
    let mut last_i16: i16 = 0;
    for field in shape.fields {
        match field {
            Field::I8 => {
                writer.write_i8(reader.read_i8().await?).await?;
            }
            Field::I16 => {
                last_i16 = writer.write_i16(reader.read_i16().await?).await?;
            }
            Field::I32 => {
                last_i32 = writer.write_i32(reader.read_i32().await?).await?;
            }
            Field::I64 => {
                writer.write_i64(reader.read_i64().await?).await?;
            }
            Field::F32 => {
                writer.write_f32(reader.read_f32().await?).await?;
            }
            Field::F64 => {
                writer.write_f64(reader.read_f64().await?).await?;
            }
            Field::Bool => {
                writer.write_bool(reader.read_bool().await?).await?;
            }
            Field::Utf16 => {
                let s = reader.read_utf16().await?;
                writer.write_utf16(&s).await?;
            }
            Field::Item => {
                Item::read(reader).await?.write(writer).await?;
            }
            Field::MetadataBlob => {
                MetadataBlob::read(reader).await?.write(writer).await?;
            }
            Field::BytesLenI32 => {
                io::copy(reader, writer, last_i32.max(0) as usize).await?;
            }
            Field::ItemsLenI16 => {
                for _ in 0..last_i16.max(0) {
                    Item::read(reader).await?.write(writer).await?;
                }
            }
        }
    }
    Ok(())
}
