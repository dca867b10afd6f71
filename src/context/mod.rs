//! 上下文组装：问卷 + 一次性图片分析 -> 新会话的种子消息

pub mod assembler;
pub mod image;

pub use assembler::{ContextAssembler, SeedContext, UserProfile, NO_IMAGE_ANALYSIS};
pub use image::{ImageInput, DEFAULT_MAX_IMAGE_BYTES};
