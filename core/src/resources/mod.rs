//! Per-resource models, filters and operations.
//!
//! Each module adds `impl CrmClient` blocks on top of the generic helpers in
//! `client`; none of them talk to the transport directly.

pub mod account;
pub mod companies;
pub mod contacts;
pub mod custom_fields;
pub mod customers;
pub mod deals;
pub mod links;
pub mod notes;
pub mod pipelines;
pub mod tasks;
pub mod transactions;
pub mod users;
pub mod widgets;

pub use account::Account;
pub use companies::{Company, CompanyFilter, CompanyLinks, CompanyUpdate, NewCompany};
pub use contacts::{Contact, ContactFilter, ContactLinks, ContactUpdate, NewContact};
pub use custom_fields::{CustomField, FieldEnum, NewCustomField};
pub use customers::{Customer, CustomerFilter, CustomerLinks, CustomerUpdate, NewCustomer};
pub use deals::{Deal, DealFilter, DealLinks, DealUpdate, NewDeal, StageRef};
pub use links::{EntityLink, LinkFilter};
pub use notes::{NewNote, Note, NoteFilter};
pub use pipelines::{Pipeline, PipelineStages, Stage};
pub use tasks::{NewTask, Task, TaskFilter, TaskResult, TaskUpdate};
pub use transactions::{NewTransaction, Transaction};
pub use users::{User, UserRights};
pub use widgets::Widget;
