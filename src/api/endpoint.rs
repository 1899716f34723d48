use chrono::NaiveDate;

pub type Endpoint = str;

pub const LOGIN: &Endpoint = "/";
pub const SYSTEM_CONFIG: &Endpoint = "/system/summary/config";
pub const AGGREGATE_ENERGY: &Endpoint = "/api/v4/system/summary/aggenergy";
pub const LAST_VALUE: &Endpoint = "/api/v4/system/summary/lastvalue";
pub const AGGREGATE: &Endpoint = "/api/v4/data/aggregate";

pub fn system_config(system_id: &str) -> String {
    format!(
        "{}?system_id={}&resourceId=config&v=0.1.0&_=0",
        SYSTEM_CONFIG, system_id
    )
}

pub fn aggregate_energy(system_id: &str, date: NaiveDate) -> String {
    format!(
        "{}?system_id={}&date={}",
        AGGREGATE_ENERGY,
        system_id,
        date.format("%Y-%m-%d")
    )
}

pub fn last_value(system_id: &str, date: NaiveDate, metric: &str, fingerprint: &str) -> String {
    format!(
        "{}?system_id={}&resourceId=lastValue-{}-{}-{}&v=0.1.0&_=0",
        LAST_VALUE,
        system_id,
        date.format("%Y-%m-%d"),
        metric,
        fingerprint
    )
}

pub fn aggregate(system_id: &str, date: NaiveDate, agg: &str) -> String {
    let date = date.format("%Y-%m-%d");
    format!(
        "{}?systemId={}&view=gen&output=echart&type=bar&agg={}&start={}&end={}&reclaimed=true",
        AGGREGATE, system_id, agg, date, date
    )
}

#[cfg(test)]
mod test {
    use chrono::NaiveDate;

    #[test]
    fn last_value_resource_id() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(
            "/api/v4/system/summary/lastvalue?system_id=42&resourceId=lastValue-2024-01-01-pin-10:15&v=0.1.0&_=0",
            super::last_value("42", date, "pin", "10:15")
        );
    }

    #[test]
    fn aggregate_energy_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(
            "/api/v4/system/summary/aggenergy?system_id=42&date=2024-03-09",
            super::aggregate_energy("42", date)
        );
    }
}
