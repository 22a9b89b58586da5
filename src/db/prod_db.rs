use crate::db::timocom::barometer_archive::BarometerArchive;

pub struct ProdDb {}

impl ProdDb {
    pub fn timocom_barometer() -> BarometerArchive {
        BarometerArchive {
            dump_path: "data/timocom_barometer.json".to_string(),
            monthly_path: "data/timocom_barometer.csv".to_string(),
            now_path: "data/timocom_barometer_now.csv".to_string(),
        }
    }
}
