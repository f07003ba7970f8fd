pub mod health;
pub use self::health::health;

pub mod user_register;
pub use self::user_register::register;

pub mod user_login;
pub use self::user_login::login;

pub mod user_activate;
pub use self::user_activate::activate;

pub mod user_me;
pub use self::user_me::me;
