use ustva_derive::Validate;

#[derive(Validate)]
pub struct Address {
    pub city: String,
    #[validate(postal_code)]
    pub plz: String,
}

fn main() {
    let a = Address::new("Berlin".into(), "10115".into());
    assert!(a.is_ok());

    let a = Address::new("Berlin".into(), "1011".into());
    assert_eq!(a.err().as_deref(), Some("plz must be a five digit postal code"));
}
