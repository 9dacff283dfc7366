use crate::interpreter::tree_walk::error::{ErrorKind, RuntimeError};
use crate::interpreter::tree_walk::Interpreter;
use crate::reader::lexer;
use crate::reader::parser;

fn exec(program: &str) -> Result<Vec<String>, RuntimeError> {
    Interpreter::new().run(&read(program))
}

fn read(program: &str) -> crate::interpreter::tree_walk::ast::Node {
    let tokens = lexer::tokenize(program).expect("program should tokenize");
    parser::parse(&tokens).expect("program should parse")
}

fn lines(program: &str) -> Vec<String> {
    exec(program).unwrap()
}

fn kind(program: &str) -> ErrorKind {
    exec(program).unwrap_err().kind
}

#[test]
fn test_literals_print() {
    // runTest 42 #t "hi" => 42 #t hi
    assert_eq!(lines("42 #t \"hi\""), vec!["42", "#t", "hi"]);
}

#[test]
fn test_declarations_print_nothing() {
    assert_eq!(lines("(define x 1) (define (f a) a)"), Vec::<String>::new());
}

#[test]
fn test_operator_folding() {
    // runTest (+ 1 2 3 4) => 10
    assert_eq!(lines("(+ 1 2 3 4)"), vec!["10"]);
    // runTest (- 10 1 2) => 7
    assert_eq!(lines("(- 10 1 2)"), vec!["7"]);
    // runTest (sqrt 9) => 3
    assert_eq!(lines("(sqrt 9)"), vec!["3"]);
    // runTest (^ 2 10) => 1024
    assert_eq!(lines("(^ 2 10)"), vec!["1024"]);
}

#[test]
fn test_single_operand_folds_are_rejected() {
    // - < and have no unary reading, unlike sqrt or not
    assert_eq!(kind("(- 5)"), ErrorKind::ArityMismatch);
    assert_eq!(kind("(< 5)"), ErrorKind::ArityMismatch);
    assert_eq!(kind("(and 5)"), ErrorKind::ArityMismatch);
}

#[test]
fn test_fold_failure_stops_later_operands() {
    // the boolean operand fails the fold before the unbound name is reached
    assert_eq!(kind("(+ 1 #t missing)"), ErrorKind::TypeMismatch);
}

#[test]
fn test_substitution_is_positional() {
    // runTest (define (sub a b) (- a b)) (sub 5 2) => 3
    assert_eq!(lines("(define (sub a b) (- a b)) (sub 5 2)"), vec!["3"]);
    // runTest (define (sub a b) (- a b)) (sub 2 5) => -3
    assert_eq!(lines("(define (sub a b) (- a b)) (sub 2 5)"), vec!["-3"]);
}

#[test]
fn test_variables_reevaluate_on_lookup() {
    // runTest (define x (+ y 1)) (define y 4) x => 5
    assert_eq!(lines("(define x (+ y 1)) (define y 4) x"), vec!["5"]);
    // a set! on y is visible through x afterwards
    assert_eq!(lines("(define y 4) (define x (+ y 1)) (set! y 10) x"), vec!["11"]);
}

#[test]
fn test_let_bindings_see_outer_scope_only() {
    assert_eq!(kind("(let ((x 1) (y x)) y)"), ErrorKind::UnboundIdentifier);
    // runTest (define x 10) (let ((x 1) (y x)) y) => 10
    assert_eq!(lines("(define x 10) (let ((x 1) (y x)) y)"), vec!["10"]);
}

#[test]
fn test_let_star_bindings_see_siblings() {
    // runTest (let* ((x 1) (y x)) y) => 1
    assert_eq!(lines("(let* ((x 1) (y x)) y)"), vec!["1"]);
    // runTest (let* ((x 1) (y (+ x 1)) (z (+ y 1))) z) => 3
    assert_eq!(lines("(let* ((x 1) (y (+ x 1)) (z (+ y 1))) z)"), vec!["3"]);
}

#[test]
fn test_let_bindings_are_popped() {
    assert_eq!(kind("(let ((x 1)) x) x"), ErrorKind::UnboundIdentifier);
}

#[test]
fn test_letrec_mutual_recursion() {
    // runTest (letrec ((even? ...) (odd? ...)) (even? 10)) => #t
    let program = "(letrec ((even? (lambda (n) (if (= n 0) #t (odd? (- n 1))))) \
                            (odd? (lambda (n) (if (= n 0) #f (even? (- n 1)))))) \
                     (even? 10))";
    assert_eq!(lines(program), vec!["#t"]);
}

#[test]
fn test_letrec_forward_reference() {
    // runTest (letrec ((a b) (b 2)) a) => 2
    assert_eq!(lines("(letrec ((a b) (b 2)) a)"), vec!["2"]);
}

#[test]
fn test_if_branches() {
    // runTest (if (> 1 2) 3 4) => 4
    assert_eq!(lines("(if (> 1 2) 3 4)"), vec!["4"]);
    // the untaken branch would be unbound if evaluated
    assert_eq!(lines("(if (< 1 2) 3 missing)"), vec!["3"]);
    assert_eq!(kind("(if 1 2 3)"), ErrorKind::TypeMismatch);
}

#[test]
fn test_cond_fallthrough() {
    // runTest (cond ((= 1 2) 1) ((= 1 3) 2) (else 42)) => 42
    assert_eq!(lines("(cond ((= 1 2) 1) ((= 1 3) 2) (else 42))"), vec!["42"]);
    // runTest (cond ((= 1 1) 7) (else 42)) => 7
    assert_eq!(lines("(cond ((= 1 1) 7) (else 42))"), vec!["7"]);
    assert_eq!(kind("(cond (1 2) (else 3))"), ErrorKind::TypeMismatch);
}

#[test]
fn test_recursion_factorial() {
    // runTest (define (fact n) ...) (fact 5) => 120
    let program = "(define (fact n) (if (= n 0) 1 (* n (fact (- n 1))))) (fact 5)";
    assert_eq!(lines(program), vec!["120"]);
}

#[test]
fn test_recursion_fibonacci() {
    // runTest (fib 10) => 55
    let program = "(define (fib n) \
                     (if (< n 2) n (+ (fib (- n 1)) (fib (- n 2))))) \
                   (fib 10)";
    assert_eq!(lines(program), vec!["55"]);
}

#[test]
fn test_arity_mismatch() {
    assert_eq!(kind("(define (f a b) (+ a b)) (f 1)"), ErrorKind::ArityMismatch);
    assert_eq!(kind("(define (f a b) (+ a b)) (f 1 2 3)"), ErrorKind::ArityMismatch);
}

#[test]
fn test_currying() {
    // runTest (define (make-adder x) (lambda (y) (+ x y))) ((make-adder 1) 41) => 42
    let program = "(define (make-adder x) (lambda (y) (+ x y))) ((make-adder 1) 41)";
    assert_eq!(lines(program), vec!["42"]);
    // without the trailing argument the returned lambda has nothing to bind
    let missing = "(define (make-adder x) (lambda (y) (+ x y))) (make-adder 1)";
    assert_eq!(kind(missing), ErrorKind::ArityMismatch);
}

#[test]
fn test_inline_lambda_call() {
    // runTest ((lambda (x) (* x x)) 6) => 36
    assert_eq!(lines("((lambda (x) (* x x)) 6)"), vec!["36"]);
}

#[test]
fn test_named_lambda_call() {
    // runTest (define square (lambda (x) (* x x))) (square 7) => 49
    assert_eq!(lines("(define square (lambda (x) (* x x))) (square 7)"), vec!["49"]);
}

#[test]
fn test_higher_order_named_procedure() {
    // runTest (define (twice f x) (f (f x))) (define (inc n) (+ n 1)) (twice inc 3) => 5
    let program = "(define (twice f x) (f (f x))) (define (inc n) (+ n 1)) (twice inc 3)";
    assert_eq!(lines(program), vec!["5"]);
}

#[test]
fn test_higher_order_lambda_argument() {
    // runTest (define (twice f x) (f (f x))) (twice (lambda (v) (* v 2)) 3) => 12
    let program = "(define (twice f x) (f (f x))) (twice (lambda (v) (* v 2)) 3)";
    assert_eq!(lines(program), vec!["12"]);
}

#[test]
fn test_pairs_and_lists_render() {
    // runTest (cons 1 2) => (1 . 2)
    assert_eq!(lines("(cons 1 2)"), vec!["(1 . 2)"]);
    // runTest (list 1 2 3) => (1 2 3)
    assert_eq!(lines("(list 1 2 3)"), vec!["(1 2 3)"]);
    assert_eq!(lines("(cons 1 (cons 2 3))"), vec!["(1 . (2 . 3))"]);
    assert_eq!(lines("()"), vec!["()"]);
}

#[test]
fn test_pair_sides_evaluate() {
    // runTest (define x 4) (cons x (+ 1 1)) => (4 . 2)
    assert_eq!(lines("(define x 4) (cons x (+ 1 1))"), vec!["(4 . 2)"]);
}

#[test]
fn test_car_cdr() {
    assert_eq!(lines("(car (list 1 2 3))"), vec!["1"]);
    assert_eq!(lines("(cdr (list 1 2 3))"), vec!["(2 3)"]);
    assert_eq!(lines("(null? (cdr (list 1)))"), vec!["#t"]);
    assert_eq!(kind("(car 5)"), ErrorKind::TypeMismatch);
    assert_eq!(kind("(car ())"), ErrorKind::TypeMismatch);
}

#[test]
fn test_eq_vs_equal() {
    // separately built pairs are equal? but not eq?
    assert_eq!(lines("(eq? (cons 1 2) (cons 1 2))"), vec!["#f"]);
    assert_eq!(lines("(equal? (cons 1 2) (cons 1 2))"), vec!["#t"]);
    // numbers compare by value under both
    assert_eq!(lines("(eq? 3 3)"), vec!["#t"]);
    assert_eq!(lines("(equal? \"a\" \"b\")"), vec!["#f"]);
}

#[test]
fn test_set_rebinding() {
    // runTest (define x 1) (set! x 2) x => 2
    assert_eq!(lines("(define x 1) (set! x 2) x"), vec!["2"]);
    assert_eq!(kind("(set! nope 1)"), ErrorKind::UnboundIdentifier);
}

#[test]
fn test_set_pair_sides() {
    // runTest (define p (cons 1 2)) (set-car! p 9) p => (9 . 2)
    assert_eq!(lines("(define p (cons 1 2)) (set-car! p 9) p"), vec!["(9 . 2)"]);
    // runTest (define p (cons 1 2)) (set-cdr! p 9) p => (1 . 9)
    assert_eq!(lines("(define p (cons 1 2)) (set-cdr! p 9) p"), vec!["(1 . 9)"]);
    assert_eq!(kind("(define n 3) (set-car! n 1)"), ErrorKind::TypeMismatch);
}

#[test]
fn test_string_primitives() {
    // runTest (append "foo" "bar") => foobar
    assert_eq!(lines("(append \"foo\" \"bar\")"), vec!["foobar"]);
    assert_eq!(lines("(strlen \"hello\")"), vec!["5"]);
    assert_eq!(lines("(str->num \"3.5\")"), vec!["3.5"]);
    assert_eq!(lines("(num->str 42)"), vec!["42"]);
    assert_eq!(kind("(str->num \"pancake\")"), ErrorKind::TypeMismatch);
}

#[test]
fn test_type_predicates() {
    assert_eq!(lines("(number? 1)"), vec!["#t"]);
    assert_eq!(lines("(bool? #f)"), vec!["#t"]);
    assert_eq!(lines("(string? \"s\")"), vec!["#t"]);
    assert_eq!(lines("(pair? (cons 1 2))"), vec!["#t"]);
    assert_eq!(lines("(pair? ())"), vec!["#f"]);
    assert_eq!(lines("(null? ())"), vec!["#t"]);
    assert_eq!(lines("(number? \"1\")"), vec!["#f"]);
}

#[test]
fn test_division_propagates_ieee() {
    // runTest (/ 1 0) => inf
    assert_eq!(lines("(/ 1 0)"), vec!["inf"]);
    assert_eq!(lines("(% 5 0)"), vec!["NaN"]);
}

#[test]
fn test_unbound_identifier() {
    assert_eq!(kind("missing"), ErrorKind::UnboundIdentifier);
    assert_eq!(kind("(missing 1)"), ErrorKind::UnboundIdentifier);
}

#[test]
fn test_calling_a_non_callable() {
    assert_eq!(kind("(define x 5) (x 1)"), ErrorKind::TypeMismatch);
}

#[test]
fn test_vectors_do_not_evaluate() {
    assert_eq!(kind("(vector 1 2)"), ErrorKind::UnsupportedForm);
    assert_eq!(kind("#(1 2)"), ErrorKind::UnsupportedForm);
}

#[test]
fn test_failure_stops_the_run() {
    assert_eq!(kind("(+ 1 2) (car 5) (+ 3 4)"), ErrorKind::TypeMismatch);
}

#[test]
fn test_global_scope_survives_runs() {
    let mut interpreter = Interpreter::new();
    assert_eq!(interpreter.run(&read("(define x 5)")).unwrap(), Vec::<String>::new());
    assert_eq!(interpreter.run(&read("(+ x 1)")).unwrap(), vec!["6"]);
}

#[test]
fn test_display_value_is_not_reprinted() {
    // display writes as a side effect; the form's own value prints nothing
    assert_eq!(lines("(display \"out\")"), Vec::<String>::new());
}

#[test]
fn test_boolean_primitives() {
    assert_eq!(lines("(and #t #f)"), vec!["#f"]);
    assert_eq!(lines("(or #f #t)"), vec!["#t"]);
    assert_eq!(lines("(not #f)"), vec!["#t"]);
    assert_eq!(lines("(true? 1)"), vec!["#f"]);
    assert_eq!(lines("(false? #f)"), vec!["#t"]);
    assert_eq!(kind("(and 1 #t)"), ErrorKind::TypeMismatch);
}

#[test]
fn test_comparison_chain_folds() {
    // a fold turns the running boolean into the next operand
    assert_eq!(lines("(< 1 2)"), vec!["#t"]);
    assert_eq!(kind("(< 1 2 3)"), ErrorKind::TypeMismatch);
}

#[test]
fn test_shadowing_is_rewritten_not_scoped() {
    // the let binding name inside the body is itself a substitution target
    let program = "(define (f x) (let ((x 5)) x)) (f 2)";
    assert_eq!(kind(program), ErrorKind::TypeMismatch);
}
