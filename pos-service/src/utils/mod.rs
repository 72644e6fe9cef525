pub mod dates;
pub mod password;
pub mod validation;

pub use dates::{DateRange, DayFilter, ShopClock};
pub use password::{hash_password, verify_password, Password, PasswordHashString};
pub use validation::ValidatedJson;
