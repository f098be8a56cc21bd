//! 记忆层：会话内的对话记录（仅内存，不做跨进程持久化）

pub mod transcript;

pub use transcript::{now_timestamp, Message, Role, Transcript};
