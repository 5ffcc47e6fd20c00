// Token acquisition endpoints: account creation and credential login.

pub mod login; // POST /auth/login - authenticate and get JWT
pub mod register; // POST /auth/register - create new account

pub use login::login;
pub use register::register;
