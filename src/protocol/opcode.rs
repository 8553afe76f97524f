//! Opcode constants for the wire protocol's single-byte tag dispatch.
//! Grouped as plain `u8` consts, not an enum, because the dispatcher
//! matches on the raw byte read straight off the wire before anything
//! is known to be well-formed.

pub const KEEP_ALIVE: u8 = 0x00;
pub const LOGIN: u8 = 0x01;
pub const HANDSHAKE: u8 = 0x02;
pub const CHAT: u8 = 0x03;
pub const TIME_UPDATE: u8 = 0x04;
pub const ENTITY_EQUIPMENT: u8 = 0x05;
pub const SPAWN_POSITION: u8 = 0x06;
pub const USE_ENTITY: u8 = 0x07;
pub const UPDATE_HEALTH: u8 = 0x08;
pub const RESPAWN: u8 = 0x09;
pub const PLAYER: u8 = 0x0A;
pub const PLAYER_POSITION: u8 = 0x0B;
pub const PLAYER_LOOK: u8 = 0x0C;
pub const PLAYER_POSITION_LOOK: u8 = 0x0D;
pub const DIG: u8 = 0x0E;
pub const PLACE: u8 = 0x0F;
pub const BLOCK_ITEM_SWITCH: u8 = 0x10;
pub const ANIMATION: u8 = 0x12;
pub const ENTITY_ACTION: u8 = 0x13;
pub const NAMED_ENTITY_SPAWN: u8 = 0x14;
pub const ENTITY_VELOCITY: u8 = 0x1C;
pub const DESTROY_ENTITY: u8 = 0x1D;
pub const ENTITY: u8 = 0x1E;
pub const ENTITY_RELATIVE_MOVE: u8 = 0x1F;
pub const ENTITY_LOOK: u8 = 0x20;
pub const ENTITY_LOOK_RELATIVE_MOVE: u8 = 0x21;
pub const ENTITY_TELEPORT: u8 = 0x22;
pub const ENTITY_STATUS: u8 = 0x26;
pub const ATTACH_ENTITY: u8 = 0x27;
pub const ENTITY_METADATA: u8 = 0x28;
pub const PRE_CHUNK: u8 = 0x32;
pub const CHUNK: u8 = 0x33;
pub const BLOCK_CHANGE: u8 = 0x35;
pub const BLOCK_ACTION: u8 = 0x36;
pub const NEW_STATE: u8 = 0x46;
pub const OPEN_WINDOW: u8 = 0x64;
pub const CLOSE_WINDOW: u8 = 0x65;
pub const SET_SLOT: u8 = 0x67;
pub const WINDOW_ITEMS: u8 = 0x68;
pub const UPDATE_PROGRESS_BAR: u8 = 0x69;
pub const TRANSACTION: u8 = 0x6A;
pub const PLAYER_LIST_ITEM: u8 = 0xC9;
pub const SERVER_LIST_PING: u8 = 0xFE;
pub const ENCRYPTION_RESPONSE: u8 = 0xFC;
pub const ENCRYPTION_REQUEST: u8 = 0xFD;
pub const DISCONNECT: u8 = 0xFF;

/// Mod-specific opcodes, absent from some protocol revisions; gated
/// behind [`crate::config::TunnelConfig::enable_mod_opcodes`].
pub const MOD_D3: u8 = 0xD3;
pub const MOD_E6: u8 = 0xE6;

/// True for opcodes that only exist when mod support is enabled.
pub fn is_mod_specific(opcode: u8) -> bool {
    matches!(opcode, MOD_D3 | MOD_E6)
}
