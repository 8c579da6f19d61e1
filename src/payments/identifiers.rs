use rand::RngCore;

/// Official receipt number: `OR-` followed by 8 uppercase hex characters.
pub fn generate_or_number() -> String {
    let mut bytes = [0u8; 4];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("OR-{}", hex::encode_upper(bytes))
}

/// 32 random bytes, hex encoded. Embedded in the QR payload and checked
/// when an officer scans the ticket.
pub fn generate_qr_signature() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Queue number shown at the booth. The first attempt is
/// `{org_code}-{student_id:03}`; later attempts append `-2`, `-3`, ...
pub fn queue_number(organization_code: &str, student_id: i64, attempt: u32) -> String {
    let base = format!("{}-{:03}", organization_code, student_id);
    if attempt <= 1 {
        base
    } else {
        format!("{}-{}", base, attempt)
    }
}

/// The attempt a queue number was issued on, or `None` when it was not
/// issued to this student by this organization.
pub fn queue_attempt(organization_code: &str, student_id: i64, queue: &str) -> Option<u32> {
    let base = format!("{}-{:03}", organization_code, student_id);
    let rest = queue.strip_prefix(&base)?;
    if rest.is_empty() {
        return Some(1);
    }

    rest.strip_prefix('-')?.parse().ok().filter(|attempt| *attempt > 1)
}
