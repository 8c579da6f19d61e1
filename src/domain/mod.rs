pub mod user;
pub mod academic;
pub mod organization;
pub mod officer;
pub mod student;
pub mod fee_type;
pub mod payment_request;
pub mod payment;
pub mod receipt;
pub mod activity_log;
pub mod scope;

pub use user::*;
pub use academic::*;
pub use organization::*;
pub use officer::*;
pub use student::*;
pub use fee_type::*;
pub use payment_request::*;
pub use payment::*;
pub use receipt::*;
pub use activity_log::*;
pub use scope::AccessScope;
