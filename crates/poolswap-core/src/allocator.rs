use crate::CoreError;
use poolswap_host::{HostBackend, LoopDevice};
use tracing::debug;

/// Number of loop device slots scanned: `/dev/loop0` through `/dev/loop255`.
pub const LOOP_NAMESPACE_SIZE: u32 = 256;

/// Return the lowest-numbered loop device that has no backing file.
pub fn allocate_loop_device(host: &dyn HostBackend) -> Result<LoopDevice, CoreError> {
    allocate_within(host, LOOP_NAMESPACE_SIZE)
}

/// Scan `0..namespace_size` in ascending order. No retry and no wraparound.
pub fn allocate_within(
    host: &dyn HostBackend,
    namespace_size: u32,
) -> Result<LoopDevice, CoreError> {
    for index in 0..namespace_size {
        let device = LoopDevice::new(index);
        if !host.is_bound(device)? {
            debug!("allocated free loop device {device}");
            return Ok(device);
        }
    }
    Err(CoreError::NoFreeDevice { namespace_size })
}
