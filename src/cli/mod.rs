pub mod ask;
pub mod doctor;
pub mod index;
pub mod search;
