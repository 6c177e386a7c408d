use ustva_derive::Validate;

#[derive(Validate)]
pub struct Reachability {
    #[validate(email)]
    pub email: Option<String>,
}

fn main() {
    assert!(Reachability::new(None).is_ok());
    assert!(Reachability::new(Some("kontakt@example.de".into())).is_ok());
    assert!(Reachability::new(Some("kontakt".into())).is_err());
}
