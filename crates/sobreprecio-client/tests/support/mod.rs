pub mod purchase_testkit;
