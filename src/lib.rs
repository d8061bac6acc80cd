//! deaddrop: a store-and-forward bridge between one Telegram user and an
//! offline human operator.
//!
//! Two flat JSON logs form the mailbox: the message log holds inbound chat
//! messages, the response log holds operator replies. `deaddrop serve` runs
//! the listener that files messages and sweeps pending responses out;
//! `deaddrop console` is the operator's side of the drop. The two processes
//! share nothing but the files.

pub mod config;
pub mod console;
pub mod listener;
pub mod mailbox;
pub mod telegram;
