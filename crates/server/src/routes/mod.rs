pub mod auth;
pub mod campaigns;
pub mod events;
pub mod health;
pub mod invitations;
pub mod registrations;
pub mod sessions;
pub mod validate;
