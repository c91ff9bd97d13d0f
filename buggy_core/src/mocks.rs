//! Do-nothing transport and motors for benches and tests.

use buggy_traits::{Motors, Transport};

/// Never receives; accepts and discards everything sent.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTransport;

impl Transport for NullTransport {
    fn name(&self) -> &str {
        "null"
    }

    fn receive_available(
        &mut self,
        _buf: &mut [u8],
    ) -> Result<usize, Box<dyn std::error::Error + Send + Sync>> {
        Ok(0)
    }

    fn send_bytes(
        &mut self,
        bytes: &[u8],
    ) -> Result<usize, Box<dyn std::error::Error + Send + Sync>> {
        Ok(bytes.len())
    }
}

/// Remembers the last command and otherwise ignores it.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMotors {
    pub last: (i32, i32),
}

impl Motors for NullMotors {
    fn set(&mut self, left: i32, right: i32) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.last = (left, right);
        Ok(())
    }
}
