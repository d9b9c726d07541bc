pub mod event;
pub mod favorite;
pub mod payout;
pub mod ticket;
pub mod user;
pub mod waitlist;

pub use event::{Event, TicketTier};
pub use favorite::Favorite;
pub use payout::PayoutRequest;
pub use ticket::Ticket;
pub use user::User;
pub use waitlist::WaitlistEntry;
