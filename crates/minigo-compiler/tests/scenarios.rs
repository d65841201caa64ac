mod common;

use common::output_of;

#[test]
fn sum_of_even_numbers_up_to_eight() {
    let src = r#"
func main() {
    var suma int = 0
    var i int = 0
    for i <= 8 {
        if i % 2 == 0 {
            suma = suma + i
        }
        i = i + 1
    }
    print("Suma de pares: ")
    println(suma)
}
"#;
    assert_eq!(output_of(src), "Suma de pares: 20\n");
}

#[test]
fn sum_of_even_numbers_up_to_ten() {
    // b runs over 2..=10, so the even terms are 2 + 4 + 6 + 8 + 10
    let src = "func main(){ var a int = 10 \n var b int = 1 \n var c int = 0 \n for b < a { b = b + 1 \n if b % 2 == 0 { c = c + b } } \n print(\"Suma de pares: \") \n println(c) }";
    assert_eq!(output_of(src), "Suma de pares: 30\n");
}

#[test]
fn factorial_with_semicolons() {
    let src = "func main() { var n int = 5; var f int = 1; for n > 1 { f = f * n; n = n - 1 }; println(f) }";
    assert_eq!(output_of(src), "120\n");
}

#[test]
fn fizzbuzz_prefix() {
    let src = r#"
func main() {
    var i int = 1
    for i <= 6 {
        var fizz bool = i % 3 == 0
        var buzz bool = i % 5 == 0
        if fizz && buzz {
            println("FizzBuzz")
        } else {
            if fizz { println("Fizz") } else {
                if buzz { println("Buzz") } else { println(i) }
            }
        }
        i = i + 1
    }
}
"#;
    assert_eq!(output_of(src), "1\n2\nFizz\n4\nBuzz\nFizz\n");
}

#[test]
fn nested_loops_with_flags() {
    let src = r#"
func main() {
    // count pairs (a, b) with a < b <= 3
    var count int = 0
    var a int = 1
    for a <= 3 {
        var b int = a + 1
        for b <= 3 && !(count > 10) {
            count = count + 1
            b = b + 1
        }
        a = a + 1
    }
    println(count)
}
"#;
    assert_eq!(output_of(src), "3\n");
}

#[test]
fn countdown_stops_at_zero() {
    let src = "func main() {\n var n int = 3\n var running bool = true\n for running {\n print(n)\n n = n - 1\n running = n > 0 || false\n }\n println(\"!\")\n}";
    assert_eq!(output_of(src), "321!\n");
}
