pub mod flows;
pub mod mq_outbox;
pub mod tx_records;
