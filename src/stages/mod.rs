pub mod stage0_preprocess;
pub mod stage1_extract;
pub mod stage2_classify;
pub mod stage3_validate;
pub mod stage4_finalize;

pub use stage0_preprocess::*;
pub use stage1_extract::*;
pub use stage2_classify::*;
pub use stage3_validate::*;
pub use stage4_finalize::*;
