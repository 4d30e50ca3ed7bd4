pub mod content;
pub mod database;
pub mod donations;
pub mod email;
pub mod jwt;
pub mod metrics;
pub mod notify;
pub mod payments;
pub mod repository;

pub use database::MongoDb;
pub use email::{EmailProvider, MockEmailService, Notification, SmtpEmailService};
pub use jwt::{JwtService, SessionClaims};
pub use notify::notify;
pub use payments::{MockPaymentGateway, PaymentGateway, PaystackClient};
pub use repository::{ListFilter, Page, PageRequest, Repositories, Repository};
