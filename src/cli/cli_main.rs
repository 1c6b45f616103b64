use super::cli_ligand_exchange_ivp::ligand_exchange_menu;
use crate::Examples::chelation_examples::chelation_examples;
use std::io::{self, Write};

pub fn run_interactive_menu() {
    loop {
        show_main_menu();
        let choice = get_user_input();

        match choice.trim() {
            "1" => ligand_exchange_menu(),
            "2" => examples_menu(),
            "0" => {
                println!("Goodbye!");
                break;
            }
            _ => println!("Invalid choice. Please try again."),
        }
    }
}
/* colors
Blue (\x1b[34m) - Welcome header text

Yellow (\x1b[33m) - Menu options (1, 2, 0)

Cyan (\x1b[36m) - "Enter your choice:" prompt

Reset (\x1b[0m) - Returns to normal color after each colored section
*/
fn show_main_menu() {
    println!(
        "\x1b[34m\n Welcome to ChelKin: competitive ligand-exchange kinetics\n
    for iron(III) chelation by siderophores \n \x1b[0m"
    );
    println!("\x1b[33m1. Ligand Exchange IVP Problems\x1b[0m");
    println!("\x1b[33m2. Examples\x1b[0m");
    println!("\x1b[33m0. Exit\x1b[0m");
    print!("\x1b[36mEnter your choice: \x1b[0m");
    io::stdout().flush().unwrap();
}

fn examples_menu() {
    loop {
        println!("\n=== Examples ===");
        println!("1. Enterobactin competing with FeEDTA");
        println!("2. Ligand library overview");
        println!("3. Reduced vs extended variant drift");
        println!("4. Saving results to files");
        println!("0. Back");
        print!("Choose example: ");
        io::stdout().flush().unwrap();

        let choice = get_user_input();
        match choice.trim() {
            "1" => chelation_examples(0),
            "2" => chelation_examples(1),
            "3" => chelation_examples(2),
            "4" => chelation_examples(3),
            "0" => break,
            _ => println!("Invalid choice. Please try again."),
        }
    }
}

fn get_user_input() -> String {
    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .expect("Failed to read input");
    input
}
