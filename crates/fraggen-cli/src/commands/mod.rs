pub mod collect;
pub mod evaluate;
pub mod inspect;
