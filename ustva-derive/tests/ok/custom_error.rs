use ustva_derive::Validate;

#[derive(Debug)]
pub struct RecordError(String);

impl From<String> for RecordError {
    fn from(message: String) -> Self {
        RecordError(message)
    }
}

#[derive(Validate)]
#[validate_error(RecordError)]
pub struct Record {
    #[validate(non_empty)]
    pub name: String,
}

fn main() {
    let err = Record::new(String::new()).err().expect("empty name rejected");
    assert_eq!(err.0, "name must be non-empty");
}
