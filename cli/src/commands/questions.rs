use melvis_core::QuestionBank;

use crate::util::print_json;

pub fn run(bank: &QuestionBank) -> i32 {
    print_json(bank)
}
