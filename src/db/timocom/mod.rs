pub mod barometer_archive;
pub mod lane_record;
