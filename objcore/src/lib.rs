mod allocator;
mod error;
mod heap;
mod image;
mod objects;
mod os;
mod primitives;
mod specials;
mod stack;
mod system;
mod tagged;
mod types;
mod vm;

pub use allocator::*;
pub use error::*;
pub use heap::*;
pub use image::{load_image, save_image};
pub use objects::{booleans::*, handles::*, strings::*, *};
pub use os::*;
pub use primitives::*;
pub use specials::*;
pub use stack::*;
pub use system::{OS_PAGE_SIZE, map_memory, page_align, unmap_memory};
pub use tagged::*;
pub use types::*;
pub use vm::*;
