//! Request/response contract for forwarding register operations from a
//! remote client. Transport and wire encoding belong to the server.

use crate::error::PioError;
use crate::wait::{CancelToken, SharedEmulator};

/// One remote register operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Request {
    /// Read a register, with its read side effects.
    Read {
        /// Register address.
        address: u32,
    },
    /// Write a register.
    Write {
        /// Register address.
        address: u32,
        /// Value written.
        value: u32,
    },
    /// Write only the bits selected by `mask`.
    WriteMasked {
        /// Register address.
        address: u32,
        /// Value written.
        value: u32,
        /// Bits affected.
        mask: u32,
    },
    /// Block until `(register & mask) == (value & mask)` or a bound expires.
    Wait {
        /// Register address.
        address: u32,
        /// Expected value.
        value: u32,
        /// Bits compared.
        mask: u32,
        /// Cycle bound, 0 for none.
        cycles_timeout: u64,
        /// Wall-clock bound in milliseconds, 0 for none.
        millis_timeout: u64,
    },
    /// Ask whether an address is mapped.
    ProvidesAddress {
        /// Address queried.
        address: u32,
    },
    /// Ask for the register name at an address.
    Label {
        /// Address queried.
        address: u32,
    },
}

/// Reply to a [`Request`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Response {
    /// Register value (`Read`, and `Wait` whether or not it matched).
    Value(u32),
    /// A write completed.
    Done,
    /// Answer to `ProvidesAddress`.
    Provided(bool),
    /// Answer to `Label`.
    Label(String),
    /// The address is not mapped.
    InvalidAddress(u32),
    /// Any other failure, rendered for the client.
    Error(String),
}

impl From<PioError> for Response {
    fn from(err: PioError) -> Self {
        match err {
            PioError::InvalidAddress { address } => Self::InvalidAddress(address),
            other => Self::Error(other.to_string()),
        }
    }
}

/// Executes remote requests.
pub trait RegisterService {
    /// Executes `request`; a pending `Wait` ends early when `cancel` fires.
    fn handle_with_cancel(&self, request: Request, cancel: &CancelToken) -> Response;

    /// Executes `request` without external cancellation.
    fn handle(&self, request: Request) -> Response {
        self.handle_with_cancel(request, &CancelToken::new())
    }
}

impl RegisterService for SharedEmulator {
    fn handle_with_cancel(&self, request: Request, cancel: &CancelToken) -> Response {
        let result = match request {
            Request::Read { address } => self.read(address).map(Response::Value),
            Request::Write { address, value } => self.write(address, value).map(|()| Response::Done),
            Request::WriteMasked {
                address,
                value,
                mask,
            } => self
                .write_masked(address, value, mask)
                .map(|()| Response::Done),
            Request::Wait {
                address,
                value,
                mask,
                cycles_timeout,
                millis_timeout,
            } => self
                .wait_with_cancel(address, value, mask, cycles_timeout, millis_timeout, cancel)
                .map(|outcome| Response::Value(outcome.value)),
            Request::ProvidesAddress { address } => {
                Ok(Response::Provided(self.provides_address(address)))
            }
            Request::Label { address } => Ok(Response::Label(self.label_for_address(address))),
        };
        result.unwrap_or_else(Response::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::{PIO0_BASE, PIO1_BASE};

    #[test]
    fn forwards_register_operations() {
        let service = SharedEmulator::default();
        let tx = PIO1_BASE + 0x010;
        assert_eq!(service.handle(Request::Write { address: tx, value: 7 }), Response::Done);
        assert_eq!(
            service.handle(Request::Read { address: PIO1_BASE + 0x00c }),
            Response::Value(1)
        );
        assert_eq!(
            service.handle(Request::WriteMasked {
                address: PIO0_BASE,
                value: 0xf,
                mask: 0x2,
            }),
            Response::Done
        );
        assert_eq!(service.handle(Request::Read { address: PIO0_BASE }), Response::Value(2));
        assert_eq!(
            service.handle(Request::Label { address: tx }),
            Response::Label("PIO1_TXF0".into())
        );
        assert_eq!(
            service.handle(Request::ProvidesAddress { address: 3 }),
            Response::Provided(false)
        );
    }

    #[test]
    fn wait_reports_last_value_on_timeout() {
        let service = SharedEmulator::default();
        let response = service.handle(Request::Wait {
            address: PIO0_BASE + 0x030,
            value: 1,
            mask: 1,
            cycles_timeout: 0,
            millis_timeout: 5,
        });
        assert_eq!(response, Response::Value(0));
    }

    #[test]
    fn errors_are_mapped() {
        let service = SharedEmulator::default();
        assert_eq!(
            service.handle(Request::Read { address: 0x10 }),
            Response::InvalidAddress(0x10)
        );
        let response = service.handle(Request::Write {
            address: PIO0_BASE + 0x0c8,
            value: 0x0000_0100,
        });
        assert!(matches!(response, Response::Error(message) if message.contains("PIO0_SM0_CLKDIV")));
    }
}
