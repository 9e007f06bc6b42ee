/// Skip a test if no MongoDB deployment is configured.
#[macro_export]
macro_rules! skip_without_mongo {
    () => {
        if std::env::var("CSFLE_TEST_MONGODB_URI").is_err() {
            eprintln!("SKIPPED: CSFLE_TEST_MONGODB_URI not set");
            return;
        }
    };
}
