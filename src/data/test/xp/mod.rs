use crate::data::xp::XpRepository;
use crate::model::XpRecord;
use sea_orm::{DbErr, EntityTrait, PaginatorTrait};
use test_utils::{builder::TestBuilder, factory};

mod delete;
mod get;
mod rank;
mod reset;
mod top;
mod upsert;
