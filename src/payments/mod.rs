pub mod identifiers;
pub mod qr;
pub mod signing;

pub use identifiers::{generate_or_number, generate_qr_signature, queue_attempt, queue_number};
pub use qr::render_payment_qr;
pub use signing::{constant_time_eq, ReceiptSigner};
