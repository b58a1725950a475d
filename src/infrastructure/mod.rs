//! I/O adapters: Postgres, NATS event publishing, payment gateway and upload storage.
pub mod db;
pub mod events;
pub mod midtrans;
pub mod uploads;
