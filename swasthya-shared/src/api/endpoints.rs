use super::API_V1_PREFIX;

fn base_join(base: &str, path: &str) -> String {
    let b = base.trim_end_matches('/');
    let p = path.trim_start_matches('/');
    format!("{}/{}", b, p)
}

pub fn auth_login(base: &str) -> String {
    base_join(base, &format!("{}/auth/login", API_V1_PREFIX))
}

pub fn records(base: &str) -> String {
    base_join(base, &format!("{}/records", API_V1_PREFIX))
}

pub fn record(base: &str, id: i32) -> String {
    base_join(base, &format!("{}/records/{}", API_V1_PREFIX, id))
}

pub fn record_status(base: &str, id: i32) -> String {
    base_join(base, &format!("{}/records/{}/status", API_V1_PREFIX, id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_without_duplicate_slashes() {
        assert_eq!(
            auth_login("http://localhost:5151/"),
            "http://localhost:5151/api/v1/auth/login"
        );
        assert_eq!(
            record_status("http://h", 7),
            "http://h/api/v1/records/7/status"
        );
    }
}
