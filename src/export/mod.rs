//! Ticket document export
//!
//! Tickets render to printable A4 HTML. When the procedure a ticket was filed
//! under carries its own template, its `{{placeholder}}` fields are filled in;
//! otherwise a built-in layout is used.

pub mod layout;
pub mod template;

pub use layout::default_template;
pub use template::{
    document_date_line, format_iso_date, render_ticket, render_ticket_with, DocumentStyle,
    EMPTY_FIELD,
};
