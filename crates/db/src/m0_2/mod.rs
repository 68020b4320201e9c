mod audit_log_module_target_idx;
mod ledger_entry_member_rule_idx;
mod ledger_entry_member_seq_idx;
mod member_account_referral_code_idx;
mod redemption_order_member_item_idx;

use sqlx_migrator::vec_box;

pub struct Migration;

sqlx_migrator::sqlite_migration!(
    Migration,
    "advisorhub",
    "m0_2",
    vec_box![crate::m0_1::Migration],
    vec_box![
        ledger_entry_member_seq_idx::CreateIndex,
        ledger_entry_member_rule_idx::CreateIndex,
        redemption_order_member_item_idx::CreateIndex,
        member_account_referral_code_idx::CreateIndex,
        audit_log_module_target_idx::CreateIndex
    ]
);
