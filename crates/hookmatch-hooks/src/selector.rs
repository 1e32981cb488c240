//! Call-points, capability tokens and capability sets.

use std::fmt;

use sha2::{Digest, Sha256};

/// Four-byte capability token identifying a call-point.
pub type Selector = [u8; 4];

/// The seven call-points of the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookMethod {
    BeforePlaceOrder,
    AfterPlaceOrder,
    OnOrderAddedToBook,
    BeforeCancelOrder,
    AfterCancelOrder,
    BeforeMatch,
    AfterMatch,
}

impl HookMethod {
    pub const ALL: [Self; 7] = [
        Self::BeforePlaceOrder,
        Self::AfterPlaceOrder,
        Self::OnOrderAddedToBook,
        Self::BeforeCancelOrder,
        Self::AfterCancelOrder,
        Self::BeforeMatch,
        Self::AfterMatch,
    ];

    /// Protocol name of the call-point.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::BeforePlaceOrder => "beforePlaceOrder",
            Self::AfterPlaceOrder => "afterPlaceOrder",
            Self::OnOrderAddedToBook => "onOrderAddedToBook",
            Self::BeforeCancelOrder => "beforeCancelOrder",
            Self::AfterCancelOrder => "afterCancelOrder",
            Self::BeforeMatch => "beforeMatch",
            Self::AfterMatch => "afterMatch",
        }
    }

    /// First four bytes of `SHA-256("hookmatch.<name>")`.
    #[must_use]
    pub fn selector(self) -> Selector {
        let digest = Sha256::new()
            .chain_update(b"hookmatch.")
            .chain_update(self.name().as_bytes())
            .finalize();
        let mut token = [0u8; 4];
        token.copy_from_slice(&digest[..4]);
        token
    }

    /// Token as lowercase hex, for logs.
    #[must_use]
    pub fn selector_hex(self) -> String {
        hex::encode(self.selector())
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for HookMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A hook's answer to one call-point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookResponse<T> {
    /// Must equal the call-point's [`HookMethod::selector`].
    pub selector: Selector,
    pub value: T,
}

impl<T> HookResponse<T> {
    /// A correctly-tokened response for `method`.
    #[must_use]
    pub fn new(method: HookMethod, value: T) -> Self {
        Self {
            selector: method.selector(),
            value,
        }
    }
}

impl HookResponse<()> {
    /// Plain acknowledgement for the notification call-points.
    #[must_use]
    pub fn ack(method: HookMethod) -> Self {
        Self::new(method, ())
    }
}

/// The set of call-points a module is wired for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HookCapabilities(u8);

impl HookCapabilities {
    #[must_use]
    pub const fn none() -> Self {
        Self(0)
    }

    #[must_use]
    pub fn all() -> Self {
        HookMethod::ALL
            .iter()
            .fold(Self::none(), |caps, m| caps.with(*m))
    }

    #[must_use]
    pub fn with(self, method: HookMethod) -> Self {
        Self(self.0 | method.bit())
    }

    #[must_use]
    pub fn contains(self, method: HookMethod) -> bool {
        self.0 & method.bit() != 0
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl FromIterator<HookMethod> for HookCapabilities {
    fn from_iter<I: IntoIterator<Item = HookMethod>>(iter: I) -> Self {
        iter.into_iter().fold(Self::none(), Self::with)
    }
}
