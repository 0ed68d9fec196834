// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Link error types.

use thiserror::Error;

/// Errors produced by the link layer.
///
/// Only [`LinkError::NotConnected`] is ever returned from a public link
/// operation. Transport failures are reported to the application as
/// notices; the other variants classify them for logging.
#[derive(Debug, Error)]
pub enum LinkError {
    /// A send was attempted while the link is not connected.
    #[error("not connected")]
    NotConnected,

    /// The transport could not establish a connection.
    #[error("connection failed: {0}")]
    ConnectFailed(String),

    /// Read or write failure on an established connection.
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for link results.
pub type LinkResult<T> = std::result::Result<T, LinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_connected_message() {
        assert_eq!(LinkError::NotConnected.to_string(), "not connected");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: LinkError = io.into();
        assert!(matches!(err, LinkError::Io(_)));
        assert!(err.to_string().contains("pipe closed"));
    }
}
