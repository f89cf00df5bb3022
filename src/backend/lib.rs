// src/backend/lib.rs

pub mod adapter;
pub mod api;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

use storage::settings::RouterSettings;

#[ic_cdk::init]
fn init(settings: Option<RouterSettings>) {
    if let Some(settings) = settings {
        storage::settings::set_settings(settings);
    }
    ic_cdk::println!("Legacy engine canister initialized.");
}

#[ic_cdk::post_upgrade]
fn post_upgrade() {
    storage::memory::UPGRADES.with(|cell| {
        let count = *cell.borrow().get() + 1;
        cell.borrow_mut()
            .set(count)
            .expect("Failed to bump upgrade counter");
        ic_cdk::println!("Legacy engine canister upgraded ({} upgrades).", count);
    });
}
