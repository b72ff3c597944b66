//! Domain models for the addressbook backend.
//!
//! Models are plain data: the store returns them, services pass them around
//! and the HTTP layer serializes them. Firm, contact and device types keep
//! the JSON field names the existing frontend sends.

pub mod device;
pub mod directory;
pub mod rbac;
pub mod user;

pub use device::{Device, DeviceFields, DeviceLink, DeviceLinkFields};
pub use directory::{Contact, ContactFields, Firm, FirmFields};
pub use rbac::{NewPermission, NewRole, Permission, Role};
pub use user::{NewUser, User, UserUpdate};
