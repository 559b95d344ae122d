//! DMA descriptor storage
//!
//! Hardware descriptor records and the fixed-capacity pool a
//! [`DescriptorStream`](crate::driver::stream::DescriptorStream) chains them from.
//! All memory is statically sized using const generics.

pub(crate) mod descriptor;
mod pool;

pub use descriptor::Descriptor;
pub(crate) use pool::DescriptorPool;
