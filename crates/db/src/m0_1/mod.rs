mod audit_log;
mod ledger_entry;
mod member_account;
mod membership_tier;
mod points_rule;
mod redeemable_item;
mod redemption_order;

use sqlx_migrator::vec_box;

pub struct Migration;

sqlx_migrator::sqlite_migration!(
    Migration,
    "advisorhub",
    "m0_1",
    vec_box![],
    vec_box![
        membership_tier::CreateTable,
        member_account::CreateTable,
        points_rule::CreateTable,
        redeemable_item::CreateTable,
        ledger_entry::CreateTable,
        redemption_order::CreateTable,
        audit_log::CreateTable
    ]
);
