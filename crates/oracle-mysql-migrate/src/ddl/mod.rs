//! Target DDL generation.
//!
//! Translates Oracle dictionary metadata into MySQL/TiDB DDL: per-column
//! fragments come from [`typemap`](crate::typemap), constraint and index
//! fragments from [`constraints`] and [`indexes`], and [`table`] composes
//! the final CREATE TABLE plus the ALTER/compatibility side-channel.

pub mod collation;
pub mod constraints;
pub mod indexes;
pub mod table;

pub use collation::{
    charset_component, mysql_character_set, mysql_collation, version_at_least,
    COLLATION_DB_VERSION, MYSQL_CHARACTER_SET,
};
pub use constraints::PrimaryKey;
pub use indexes::IndexDdl;
pub use table::{TableDdl, TablePlan, TidbVariables};
